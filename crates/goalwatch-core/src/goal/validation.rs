//! Goal input validation.
//!
//! Checks short-circuit in a fixed order (title, duration, windows) and the
//! first failure wins. The overlap scan walks pairs `i < j` in the order the
//! windows were given, so the reported pair is the first one in list order.

use super::TimeWindow;
use crate::error::ValidationError;

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DURATION_DAYS: i64 = 365;

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong {
            len,
            max: MAX_TITLE_LEN,
        });
    }
    Ok(())
}

pub fn validate_duration_days(days: i64) -> Result<(), ValidationError> {
    if days <= 0 {
        return Err(ValidationError::DurationTooShort);
    }
    if days > MAX_DURATION_DAYS {
        return Err(ValidationError::DurationTooLong {
            days,
            max: MAX_DURATION_DAYS,
        });
    }
    Ok(())
}

pub fn validate_window(window: &TimeWindow) -> Result<(), ValidationError> {
    if window.is_valid() {
        Ok(())
    } else {
        Err(ValidationError::InvalidWindow {
            window: window.to_string(),
        })
    }
}

pub fn validate_window_set(windows: &[TimeWindow]) -> Result<(), ValidationError> {
    if windows.is_empty() {
        return Err(ValidationError::NoWindows);
    }

    for window in windows {
        validate_window(window)?;
    }

    for (i, first) in windows.iter().enumerate() {
        for second in &windows[i + 1..] {
            if first.overlaps(second) {
                return Err(ValidationError::OverlappingWindows {
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
    }

    Ok(())
}

pub fn validate_goal(title: &str, duration_days: i64, windows: &[TimeWindow]) -> Result<(), ValidationError> {
    validate_title(title)?;
    validate_duration_days(duration_days)?;
    validate_window_set(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn w(index: u32, sh: u32, sm: u32, eh: u32, em: u32) -> TimeWindow {
        TimeWindow::new(index, sh, sm, eh, em)
    }

    #[test]
    fn blank_title_rejected() {
        assert_eq!(validate_title(""), Err(ValidationError::EmptyTitle));
        assert_eq!(validate_title("   \t"), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn title_length_boundary() {
        assert!(validate_title(&"a".repeat(100)).is_ok());
        assert_eq!(
            validate_title(&"a".repeat(101)),
            Err(ValidationError::TitleTooLong { len: 101, max: 100 })
        );
    }

    #[test]
    fn title_length_counts_characters() {
        assert!(validate_title(&"ж".repeat(100)).is_ok());
    }

    #[test]
    fn duration_boundaries() {
        assert_eq!(validate_duration_days(0), Err(ValidationError::DurationTooShort));
        assert_eq!(validate_duration_days(-3), Err(ValidationError::DurationTooShort));
        assert!(validate_duration_days(1).is_ok());
        assert!(validate_duration_days(365).is_ok());
        assert!(matches!(
            validate_duration_days(366),
            Err(ValidationError::DurationTooLong { days: 366, .. })
        ));
    }

    #[test]
    fn empty_window_set_rejected() {
        assert_eq!(validate_window_set(&[]), Err(ValidationError::NoWindows));
    }

    #[test]
    fn first_invalid_window_reported() {
        let windows = [w(0, 8, 0, 9, 0), w(1, 23, 0, 1, 0), w(2, 12, 0, 12, 0)];
        assert_eq!(
            validate_window_set(&windows),
            Err(ValidationError::InvalidWindow {
                window: "23:00 - 01:00".into()
            })
        );
    }

    #[test]
    fn invalid_window_beats_overlap() {
        let windows = [w(0, 8, 0, 10, 0), w(1, 9, 0, 11, 0), w(2, 15, 0, 14, 0)];
        assert!(matches!(
            validate_window_set(&windows),
            Err(ValidationError::InvalidWindow { .. })
        ));
    }

    #[test]
    fn first_overlapping_pair_in_list_order() {
        // (0,2) collides before (1,2) in i<j order, without sorting.
        let windows = [w(0, 12, 0, 14, 0), w(1, 8, 0, 9, 0), w(2, 13, 0, 15, 0), w(3, 8, 30, 9, 30)];
        assert_eq!(
            validate_window_set(&windows),
            Err(ValidationError::OverlappingWindows {
                first: "12:00 - 14:00".into(),
                second: "13:00 - 15:00".into(),
            })
        );
    }

    #[test]
    fn adjacent_windows_accepted() {
        let windows = [w(0, 8, 0, 10, 0), w(1, 10, 0, 12, 0)];
        assert!(validate_window_set(&windows).is_ok());
    }

    #[test]
    fn goal_validation_short_circuits_in_order() {
        let bad_windows = [w(0, 10, 0, 9, 0)];
        assert_eq!(validate_goal("", 0, &bad_windows), Err(ValidationError::EmptyTitle));
        assert_eq!(
            validate_goal("Read", 0, &bad_windows),
            Err(ValidationError::DurationTooShort)
        );
        assert!(matches!(
            validate_goal("Read", 30, &bad_windows),
            Err(ValidationError::InvalidWindow { .. })
        ));
        assert!(validate_goal("Read", 30, &[w(0, 19, 0, 23, 0)]).is_ok());
    }

    fn arb_valid_window() -> impl Strategy<Value = TimeWindow> {
        (0u32..1439).prop_flat_map(|start| {
            (Just(start), (start + 1)..=1439).prop_map(|(start, end)| {
                TimeWindow::new(0, start / 60, start % 60, end / 60, end % 60)
            })
        })
    }

    /// Cuts the day into disjoint slots and keeps a random subset, so every
    /// generated set is pairwise non-overlapping.
    fn arb_disjoint_set() -> impl Strategy<Value = Vec<TimeWindow>> {
        proptest::collection::btree_set(0u32..24, 1..8).prop_map(|hours| {
            hours
                .into_iter()
                .enumerate()
                .map(|(i, h)| TimeWindow::new(i as u32, h, 0, h, 59))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn disjoint_sets_validate(windows in arb_disjoint_set()) {
            prop_assert!(validate_window_set(&windows).is_ok());
        }

        #[test]
        fn inserting_overlap_fails_and_removing_restores(
            windows in arb_disjoint_set(),
            pick in any::<proptest::sample::Index>(),
            minute in 0u32..59,
        ) {
            let target = windows[pick.index(windows.len())];
            // Starts inside the target's hour, so it always intersects it.
            let intruder = TimeWindow::new(windows.len() as u32, target.start_hour, minute, target.start_hour, 59);

            let mut with_intruder = windows.clone();
            with_intruder.push(intruder);
            let overlapping = matches!(
                validate_window_set(&with_intruder),
                Err(ValidationError::OverlappingWindows { .. })
            );
            prop_assert!(overlapping);

            with_intruder.pop();
            prop_assert!(validate_window_set(&with_intruder).is_ok());
        }

        #[test]
        fn start_not_before_end_always_invalid(
            sh in 0u32..24, sm in 0u32..60, eh in 0u32..24, em in 0u32..60,
        ) {
            let window = TimeWindow::new(0, sh, sm, eh, em);
            if sh * 60 + sm >= eh * 60 + em {
                prop_assert!(validate_window(&window).is_err());
            } else {
                prop_assert!(validate_window(&window).is_ok());
            }
        }

        #[test]
        fn single_valid_window_validates(window in arb_valid_window()) {
            prop_assert!(validate_window_set(&[window]).is_ok());
        }
    }
}
