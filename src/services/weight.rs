use std::collections::HashMap;

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::{PackedProp, PackingContainer, Prop};

pub const KILOGRAMS: &str = "kg";

/// Aggregated weight, always reported in kilograms.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WeightSummary {
    pub total_weight: f64,
    pub weight_unit: &'static str,
}

/// Weight of one packed entry in kilograms. Entries whose prop is missing
/// from the catalog, or whose prop has no recorded weight, count as zero.
pub fn packed_prop_weight(entry: &PackedProp, props: &HashMap<String, Prop>) -> f64 {
    props
        .get(&entry.prop_id)
        .and_then(|prop| prop.weight.as_ref())
        .map(|weight| weight.to_kilograms() * f64::from(entry.quantity))
        .unwrap_or(0.0)
}

/// Sums the weights of the props packed directly in this container. Nested
/// containers are not included.
pub fn container_weight(container: &PackingContainer, props: &HashMap<String, Prop>) -> WeightSummary {
    let total_weight = container
        .props
        .iter()
        .map(|entry| packed_prop_weight(entry, props))
        .sum();
    WeightSummary {
        total_weight,
        weight_unit: KILOGRAMS,
    }
}

/// Rejects a pack that would push the container past its weight limit. The
/// check only fires when both the limit and the prop's weight are known;
/// otherwise packing is allowed.
pub fn check_capacity(
    container: &PackingContainer,
    props: &HashMap<String, Prop>,
    prop_id: &str,
    quantity: u32,
) -> AppResult<()> {
    let Some(max_weight) = &container.max_weight else {
        return Ok(());
    };
    let Some(prop_weight) = props.get(prop_id).and_then(|prop| prop.weight.as_ref()) else {
        return Ok(());
    };

    let other_entries: f64 = container
        .props
        .iter()
        .filter(|entry| entry.prop_id != prop_id)
        .map(|entry| packed_prop_weight(entry, props))
        .sum();
    let proposed = other_entries + prop_weight.to_kilograms() * f64::from(quantity);
    let limit = max_weight.to_kilograms();

    if proposed > limit {
        return Err(AppError::CapacityExceeded(format!(
            "Container {} holds at most {:.3} kg but would carry {:.3} kg",
            container.name, limit, proposed
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::{ContainerStatus, Weight, WeightUnit};

    fn prop(id: &str, weight: Option<Weight>) -> Prop {
        Prop {
            id: id.to_string(),
            name: id.to_uppercase(),
            show_id: None,
            weight,
        }
    }

    fn catalog(props: Vec<Prop>) -> HashMap<String, Prop> {
        props.into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    fn container(props: Vec<PackedProp>, max_weight: Option<Weight>) -> PackingContainer {
        PackingContainer {
            id: "c1".to_string(),
            parent_id: None,
            name: "Road case".to_string(),
            container_type: None,
            description: None,
            location: None,
            dimensions: None,
            max_weight,
            props,
            labels: vec![],
            status: ContainerStatus::Partial,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by: None,
            updated_by: None,
        }
    }

    fn entry(prop_id: &str, quantity: u32) -> PackedProp {
        PackedProp {
            prop_id: prop_id.to_string(),
            quantity,
            notes: None,
        }
    }

    fn kg(value: f64) -> Weight {
        Weight {
            value,
            unit: WeightUnit::Kg,
        }
    }

    #[test]
    fn empty_container_weighs_nothing() {
        let summary = container_weight(&container(vec![], None), &catalog(vec![]));
        assert_eq!(summary.total_weight, 0.0);
        assert_eq!(summary.weight_unit, "kg");
    }

    #[test]
    fn sums_quantities_and_normalizes_units() {
        let props = catalog(vec![
            prop(
                "lamp",
                Some(Weight {
                    value: 2.0,
                    unit: WeightUnit::Lb,
                }),
            ),
            prop(
                "cable",
                Some(Weight {
                    value: 500.0,
                    unit: WeightUnit::G,
                }),
            ),
            prop("chair", Some(kg(4.0))),
        ]);
        let container = container(
            vec![entry("lamp", 2), entry("cable", 3), entry("chair", 1)],
            None,
        );

        let summary = container_weight(&container, &props);
        // 2 lb x2 = 1.814368 kg, 500 g x3 = 1.5 kg, 4 kg x1.
        assert!((summary.total_weight - 7.314368).abs() < 1e-9);
    }

    #[test]
    fn unknown_props_and_missing_weights_count_as_zero() {
        let props = catalog(vec![prop("known", None)]);
        let container = container(vec![entry("known", 5), entry("ghost", 2)], None);

        let summary = container_weight(&container, &props);
        assert_eq!(summary.total_weight, 0.0);
    }

    #[test]
    fn capacity_check_passes_when_weights_unknown() {
        let props = catalog(vec![prop("mystery", None)]);
        let limited = container(vec![], Some(kg(1.0)));

        assert!(check_capacity(&limited, &props, "mystery", 100).is_ok());
        assert!(check_capacity(&limited, &props, "ghost", 100).is_ok());

        let unlimited = container(vec![], None);
        let heavy = catalog(vec![prop("anvil", Some(kg(50.0)))]);
        assert!(check_capacity(&unlimited, &heavy, "anvil", 100).is_ok());
    }

    #[test]
    fn capacity_check_rejects_overweight_pack() {
        let props = catalog(vec![prop("anvil", Some(kg(4.0)))]);
        let limited = container(vec![entry("anvil", 2)], Some(kg(10.0)));

        // Raising the anvil entry to 3 would carry 12 kg into a 10 kg case.
        let err = check_capacity(&limited, &props, "anvil", 3).unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));

        assert!(check_capacity(&limited, &props, "anvil", 2).is_ok());
    }

    #[test]
    fn capacity_check_counts_other_entries() {
        let props = catalog(vec![
            prop("anvil", Some(kg(6.0))),
            prop("feather", Some(kg(0.5))),
        ]);
        let limited = container(vec![entry("anvil", 1)], Some(kg(8.0)));

        let err = check_capacity(&limited, &props, "feather", 5).unwrap_err();
        assert!(matches!(err, AppError::CapacityExceeded(_)));
        assert!(check_capacity(&limited, &props, "feather", 4).is_ok());
    }

    #[test]
    fn pound_and_gram_conversions() {
        let two_pounds = Weight {
            value: 2.0,
            unit: WeightUnit::Lb,
        };
        assert!((two_pounds.to_kilograms() - 0.907184).abs() < 1e-9);

        let grams = Weight {
            value: 250.0,
            unit: WeightUnit::G,
        };
        assert!((grams.to_kilograms() - 0.25).abs() < 1e-12);

        assert_eq!(kg(3.5).to_kilograms(), 3.5);
    }
}
