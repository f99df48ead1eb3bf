/// Asserts the blocks a [`CollectingReducer`](crate::test_utils::CollectingReducer) folded into a
/// subscriber's durable changes, and optionally into its tentative changes.
///
/// # Examples
///
/// ```ignore
/// let view = publisher.get_state("wallet").await?;
/// assert_collected!(view, durable = [105, 105, 120, 140], tentative = [145]);
/// ```
#[macro_export]
macro_rules! assert_collected {
    ($view: expr, durable = [$($durable:expr),* $(,)?]) => {{
        let view = &$view;
        let expected: Vec<u64> = vec![$($durable),*];
        assert_eq!(
            $crate::test_utils::collected_blocks(&view.changes),
            expected,
            "durable changes differ: {:?}",
            view.changes
        );
    }};
    ($view: expr, durable = [$($durable:expr),* $(,)?], tentative = [$($tentative:expr),* $(,)?]) => {{
        let view = &$view;
        $crate::assert_collected!(*view, durable = [$($durable),*]);
        let expected: Vec<u64> = vec![$($tentative),*];
        let tentative = view.unsafe_changes.as_ref().expect("subscriber has no tentative state");
        assert_eq!(
            $crate::test_utils::collected_blocks(tentative),
            expected,
            "tentative changes differ: {:?}",
            tentative
        );
    }};
}

/// Waits (with a timeout in seconds, default 5) until `$cond` holds, polling every 10ms.
#[macro_export]
macro_rules! wait_until {
    ($cond: expr) => {
        $crate::wait_until!($cond, timeout = 5)
    };
    ($cond: expr, timeout = $secs: expr) => {
        tokio::time::timeout(std::time::Duration::from_secs($secs), async {
            loop {
                if $cond {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not met in time")
    };
}
