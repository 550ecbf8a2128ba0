//! Iface combination arbitration
//!
//! Decides whether a multiset of iface types fits a mode. Every iface has to
//! be assigned to a limit that lists its type, without any limit exceeding
//! `max_ifaces`. A type may appear in several limits of one combination, so
//! the assignment is searched rather than counted per type.

use crate::types::{ChipIfaceCombination, ChipMode, ChipModeId, IfaceType};

/// Whether `ifaces` can coexist under `combination`
pub fn fits_combination(combination: &ChipIfaceCombination, ifaces: &[IfaceType]) -> bool {
    let mut remaining: Vec<u32> = combination.limits.iter().map(|l| l.max_ifaces).collect();
    assign(combination, ifaces, &mut remaining)
}

fn assign(combination: &ChipIfaceCombination, ifaces: &[IfaceType], remaining: &mut [u32]) -> bool {
    let Some((&first, rest)) = ifaces.split_first() else {
        return true;
    };

    for (idx, limit) in combination.limits.iter().enumerate() {
        if remaining[idx] == 0 || !limit.allows(first) {
            continue;
        }
        remaining[idx] -= 1;
        let placed = assign(combination, rest, remaining);
        remaining[idx] += 1;
        if placed {
            return true;
        }
    }
    false
}

/// Whether `ifaces` fits at least one combination of `mode`
pub fn fits_mode(mode: &ChipMode, ifaces: &[IfaceType]) -> bool {
    mode.available_combinations
        .iter()
        .any(|combination| fits_combination(combination, ifaces))
}

/// Whether one more iface of `new_type` may join the `live` set under `mode`
pub fn can_add(mode: &ChipMode, live: &[IfaceType], new_type: IfaceType) -> bool {
    let mut wanted = Vec::with_capacity(live.len() + 1);
    wanted.extend_from_slice(live);
    wanted.push(new_type);
    fits_mode(mode, &wanted)
}

/// First mode, in enumeration order, whose limits mention `iface_type`
///
/// Ties between several capable modes go to the one reported first; this is
/// the order-of-scan behaviour, not a best-fit choice.
pub fn find_mode_for_type(modes: &[ChipMode], iface_type: IfaceType) -> Option<ChipModeId> {
    for mode in modes {
        for combination in &mode.available_combinations {
            for limit in &combination.limits {
                if limit.allows(iface_type) {
                    return Some(mode.id);
                }
            }
        }
    }
    None
}

/// Largest number of ifaces of `iface_type` the mode can host on its own
pub fn max_ifaces_of_type(mode: &ChipMode, iface_type: IfaceType) -> u32 {
    mode.available_combinations
        .iter()
        .map(|combination| {
            combination
                .limits
                .iter()
                .filter(|limit| limit.allows(iface_type))
                .map(|limit| limit.max_ifaces)
                .sum::<u32>()
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChipIfaceCombinationLimit;
    use proptest::prelude::*;

    fn sta_mode() -> ChipMode {
        ChipMode::new(
            0,
            vec![ChipIfaceCombination::new(vec![
                ChipIfaceCombinationLimit::new([IfaceType::Sta], 1),
                ChipIfaceCombinationLimit::new([IfaceType::P2p, IfaceType::Nan], 1),
            ])],
        )
    }

    fn ap_mode() -> ChipMode {
        ChipMode::new(
            1,
            vec![ChipIfaceCombination::new(vec![
                ChipIfaceCombinationLimit::new([IfaceType::Ap], 1),
            ])],
        )
    }

    #[test]
    fn test_single_slot_exclusivity() {
        let mode = ap_mode();
        assert!(can_add(&mode, &[], IfaceType::Ap));
        assert!(!can_add(&mode, &[IfaceType::Ap], IfaceType::Ap));
        assert!(!can_add(&mode, &[], IfaceType::Sta));
    }

    #[test]
    fn test_shared_limit_between_p2p_and_nan() {
        let mode = sta_mode();
        assert!(can_add(&mode, &[IfaceType::Sta], IfaceType::P2p));
        assert!(can_add(&mode, &[IfaceType::Sta], IfaceType::Nan));
        assert!(!can_add(&mode, &[IfaceType::P2p], IfaceType::Nan));
        assert!(!can_add(&mode, &[IfaceType::Nan], IfaceType::P2p));
    }

    #[test]
    fn test_overlapping_limits_need_search() {
        // 先放入的 STA 不能贪心地占用共享槽
        let combination = ChipIfaceCombination::new(vec![
            ChipIfaceCombinationLimit::new([IfaceType::Sta, IfaceType::Ap], 1),
            ChipIfaceCombinationLimit::new([IfaceType::Sta], 1),
        ]);
        assert!(fits_combination(&combination, &[IfaceType::Sta, IfaceType::Ap]));
        assert!(fits_combination(&combination, &[IfaceType::Ap, IfaceType::Sta]));
        assert!(!fits_combination(
            &combination,
            &[IfaceType::Ap, IfaceType::Sta, IfaceType::Sta]
        ));
    }

    #[test]
    fn test_find_mode_first_match() {
        let modes = vec![sta_mode(), ap_mode()];
        assert_eq!(find_mode_for_type(&modes, IfaceType::Sta), Some(0));
        assert_eq!(find_mode_for_type(&modes, IfaceType::Nan), Some(0));
        assert_eq!(find_mode_for_type(&modes, IfaceType::Ap), Some(1));

        let both_sta = vec![ChipMode::new(9, sta_mode().available_combinations), sta_mode()];
        assert_eq!(find_mode_for_type(&both_sta, IfaceType::Sta), Some(9));
        assert_eq!(find_mode_for_type(&[], IfaceType::Sta), None);
    }

    #[test]
    fn test_max_ifaces_of_type() {
        assert_eq!(max_ifaces_of_type(&sta_mode(), IfaceType::Sta), 1);
        assert_eq!(max_ifaces_of_type(&sta_mode(), IfaceType::Ap), 0);
        assert_eq!(max_ifaces_of_type(&ap_mode(), IfaceType::Ap), 1);
    }

    fn iface_type_strategy() -> impl Strategy<Value = IfaceType> {
        prop_oneof![
            Just(IfaceType::Sta),
            Just(IfaceType::Ap),
            Just(IfaceType::P2p),
            Just(IfaceType::Nan),
        ]
    }

    proptest! {
        #[test]
        fn prop_fit_is_order_independent(
            ifaces in prop::collection::vec(iface_type_strategy(), 0..5)
        ) {
            let mode = sta_mode();
            let mut reversed = ifaces.clone();
            reversed.reverse();
            prop_assert_eq!(fits_mode(&mode, &ifaces), fits_mode(&mode, &reversed));
        }

        #[test]
        fn prop_fit_is_monotonic(
            ifaces in prop::collection::vec(iface_type_strategy(), 1..5)
        ) {
            // 子集必然可行
            let mode = sta_mode();
            if fits_mode(&mode, &ifaces) {
                prop_assert!(fits_mode(&mode, &ifaces[1..]));
            }
        }

        #[test]
        fn prop_find_mode_is_deterministic(
            iface_type in iface_type_strategy()
        ) {
            let modes = vec![sta_mode(), ap_mode()];
            prop_assert_eq!(
                find_mode_for_type(&modes, iface_type),
                find_mode_for_type(&modes, iface_type)
            );
        }
    }
}
