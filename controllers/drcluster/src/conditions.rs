//! DRCluster status conditions
//!
//! Generic set-condition helpers plus the fence condition table. Every stage
//! of the fencing lifecycle asserts exactly one (Fenced, Clean) pair; the
//! setters below are the only place those pairs are written.

use crds::{
    Condition, ConditionStatus, DRCLUSTER_CONDITION_TYPE_CLEAN, DRCLUSTER_CONDITION_TYPE_FENCED,
    DRCLUSTER_VALIDATED,
};

// Condition reasons
pub const REASON_INITIALIZING: &str = "Initializing";
pub const REASON_FENCING: &str = "Fencing";
pub const REASON_UNFENCING: &str = "Unfencing";
pub const REASON_CLEANING: &str = "Cleaning";
pub const REASON_FENCED: &str = "Fenced";
pub const REASON_UNFENCED: &str = "Unfenced";
pub const REASON_CLEAN: &str = "Clean";
pub const REASON_VALIDATED: &str = "Succeeded";
pub const REASON_VALIDATION_FAILED: &str = "ValidationFailed";

pub const REASON_FENCE_ERROR: &str = "FenceError";
pub const REASON_UNFENCE_ERROR: &str = "UnfenceError";
pub const REASON_CLEAN_ERROR: &str = "CleanError";

pub const REASON_ERROR: &str = "Error";

/// Reason recorded when `spec.clusterFence` is absent, so an operator
/// erasing the field on a fenced cluster can be told apart from a fresh
/// cluster that never requested a fence.
pub const REASON_FENCE_STATE_UNSPECIFIED: &str = "FenceStateUnspecified";

/// Updates or appends a condition. The transition time only moves when the
/// status actually flips, keeping repeated reconciles from churning status.
pub fn set_status_condition(conditions: &mut Vec<Condition>, new_condition: Condition) {
    match conditions
        .iter_mut()
        .find(|c| c.type_ == new_condition.type_)
    {
        None => conditions.push(new_condition),
        Some(existing) => {
            if existing.status != new_condition.status {
                existing.status = new_condition.status;
                existing.last_transition_time = new_condition.last_transition_time;
            }

            existing.reason = new_condition.reason;
            existing.message = new_condition.message;
            existing.observed_generation = new_condition.observed_generation;
        }
    }
}

/// Appends the condition only when its type is not present yet.
pub fn set_status_condition_if_not_found(conditions: &mut Vec<Condition>, condition: Condition) {
    if !conditions.iter().any(|c| c.type_ == condition.type_) {
        conditions.push(condition);
    }
}

fn set_fence_pair(
    conditions: &mut Vec<Condition>,
    generation: i64,
    reason: &str,
    message: &str,
    fenced: ConditionStatus,
    clean: ConditionStatus,
) {
    set_status_condition(
        conditions,
        Condition::new(
            DRCLUSTER_CONDITION_TYPE_FENCED,
            fenced,
            reason,
            message,
            Some(generation),
        ),
    );
    set_status_condition(
        conditions,
        Condition::new(
            DRCLUSTER_CONDITION_TYPE_CLEAN,
            clean,
            reason,
            message,
            Some(generation),
        ),
    );
}

/// Nothing is known about a fresh DRCluster yet.
pub fn set_dr_cluster_initial_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    message: &str,
) {
    for type_ in [
        DRCLUSTER_VALIDATED,
        DRCLUSTER_CONDITION_TYPE_FENCED,
        DRCLUSTER_CONDITION_TYPE_CLEAN,
    ] {
        set_status_condition_if_not_found(
            conditions,
            Condition::new(
                type_,
                ConditionStatus::Unknown,
                REASON_INITIALIZING,
                message,
                Some(generation),
            ),
        );
    }
}

pub fn set_dr_cluster_validated_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    message: &str,
) {
    set_status_condition(
        conditions,
        Condition::new(
            DRCLUSTER_VALIDATED,
            ConditionStatus::True,
            REASON_VALIDATED,
            message,
            Some(generation),
        ),
    );
}

/// The NetworkFence ManifestWork was just placed; its status is unseen.
pub fn set_dr_cluster_fencing_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    message: &str,
) {
    set_fence_pair(
        conditions,
        generation,
        REASON_FENCING,
        message,
        ConditionStatus::False,
        ConditionStatus::True,
    );
}

/// The NetworkFence ManifestWork was just switched to unfence; the cluster
/// is still fenced until the remote status confirms.
pub fn set_dr_cluster_unfencing_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    message: &str,
) {
    set_fence_pair(
        conditions,
        generation,
        REASON_UNFENCING,
        message,
        ConditionStatus::True,
        ConditionStatus::False,
    );
}

/// Fence artifacts are being deleted; not yet confirmed gone.
pub fn set_dr_cluster_cleaning_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    message: &str,
) {
    set_fence_pair(
        conditions,
        generation,
        REASON_CLEANING,
        message,
        ConditionStatus::False,
        ConditionStatus::False,
    );
}

/// The cluster is fenced and the NetworkFence still exists.
pub fn set_dr_cluster_fenced_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    message: &str,
) {
    set_fence_pair(
        conditions,
        generation,
        REASON_FENCED,
        message,
        ConditionStatus::True,
        ConditionStatus::False,
    );
}

/// The cluster is unfenced but the NetworkFence still exists.
pub fn set_dr_cluster_unfenced_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    message: &str,
) {
    set_fence_pair(
        conditions,
        generation,
        REASON_UNFENCED,
        message,
        ConditionStatus::False,
        ConditionStatus::False,
    );
}

/// Fence artifacts are confirmed deleted.
pub fn set_dr_cluster_clean_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    message: &str,
) {
    set_fence_pair(
        conditions,
        generation,
        REASON_CLEAN,
        message,
        ConditionStatus::False,
        ConditionStatus::True,
    );
}

/// `spec.clusterFence` is absent; treated as clean but distinguishable.
pub fn set_dr_cluster_fence_unspecified_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    message: &str,
) {
    set_fence_pair(
        conditions,
        generation,
        REASON_FENCE_STATE_UNSPECIFIED,
        message,
        ConditionStatus::False,
        ConditionStatus::True,
    );
}

/// A fence attempt failed before the cluster got fenced.
pub fn set_dr_cluster_fencing_failed_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    reason: &str,
    message: &str,
) {
    set_fence_pair(
        conditions,
        generation,
        reason,
        message,
        ConditionStatus::False,
        ConditionStatus::True,
    );
}

/// An unfence attempt failed; the cluster remains fenced.
pub fn set_dr_cluster_unfencing_failed_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    reason: &str,
    message: &str,
) {
    set_fence_pair(
        conditions,
        generation,
        reason,
        message,
        ConditionStatus::True,
        ConditionStatus::False,
    );
}

/// Deleting the fence artifacts failed after a successful unfence.
pub fn set_dr_cluster_cleaning_failed_condition(
    conditions: &mut Vec<Condition>,
    generation: i64,
    message: &str,
) {
    set_fence_pair(
        conditions,
        generation,
        REASON_CLEAN_ERROR,
        message,
        ConditionStatus::False,
        ConditionStatus::False,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::find_condition;

    fn pair(conditions: &[Condition]) -> (ConditionStatus, ConditionStatus) {
        (
            find_condition(conditions, DRCLUSTER_CONDITION_TYPE_FENCED)
                .unwrap()
                .status,
            find_condition(conditions, DRCLUSTER_CONDITION_TYPE_CLEAN)
                .unwrap()
                .status,
        )
    }

    #[test]
    fn test_fence_condition_table() {
        use ConditionStatus::{False, True, Unknown};

        let mut conditions = Vec::new();

        set_dr_cluster_initial_condition(&mut conditions, 1, "init");
        assert_eq!(pair(&conditions), (Unknown, Unknown));

        set_dr_cluster_fencing_condition(&mut conditions, 1, "fencing");
        assert_eq!(pair(&conditions), (False, True));

        set_dr_cluster_fenced_condition(&mut conditions, 1, "fenced");
        assert_eq!(pair(&conditions), (True, False));

        set_dr_cluster_unfencing_condition(&mut conditions, 1, "unfencing");
        assert_eq!(pair(&conditions), (True, False));

        set_dr_cluster_unfenced_condition(&mut conditions, 1, "unfenced");
        assert_eq!(pair(&conditions), (False, False));

        set_dr_cluster_cleaning_condition(&mut conditions, 1, "cleaning");
        assert_eq!(pair(&conditions), (False, False));

        set_dr_cluster_clean_condition(&mut conditions, 1, "clean");
        assert_eq!(pair(&conditions), (False, True));

        set_dr_cluster_fencing_failed_condition(&mut conditions, 1, REASON_FENCE_ERROR, "boom");
        assert_eq!(pair(&conditions), (False, True));

        set_dr_cluster_unfencing_failed_condition(&mut conditions, 1, REASON_UNFENCE_ERROR, "boom");
        assert_eq!(pair(&conditions), (True, False));

        set_dr_cluster_cleaning_failed_condition(&mut conditions, 1, "boom");
        assert_eq!(pair(&conditions), (False, False));

        set_dr_cluster_fence_unspecified_condition(&mut conditions, 1, "no fence requested");
        assert_eq!(pair(&conditions), (False, True));
        assert_eq!(
            find_condition(&conditions, DRCLUSTER_CONDITION_TYPE_CLEAN)
                .unwrap()
                .reason,
            REASON_FENCE_STATE_UNSPECIFIED
        );
    }

    #[test]
    fn test_initial_condition_does_not_overwrite() {
        let mut conditions = Vec::new();

        set_dr_cluster_fenced_condition(&mut conditions, 1, "fenced");
        set_dr_cluster_initial_condition(&mut conditions, 2, "init");

        // The fenced pair survives a late initializer.
        assert_eq!(
            find_condition(&conditions, DRCLUSTER_CONDITION_TYPE_FENCED)
                .unwrap()
                .status,
            ConditionStatus::True
        );
    }

    #[test]
    fn test_transition_time_only_moves_on_status_flip() {
        let mut conditions = Vec::new();

        set_dr_cluster_fenced_condition(&mut conditions, 1, "fenced");
        let first = find_condition(&conditions, DRCLUSTER_CONDITION_TYPE_FENCED)
            .unwrap()
            .last_transition_time;

        set_dr_cluster_fenced_condition(&mut conditions, 2, "fenced again");
        let second = find_condition(&conditions, DRCLUSTER_CONDITION_TYPE_FENCED)
            .unwrap()
            .last_transition_time;

        assert_eq!(first, second);
        assert_eq!(
            find_condition(&conditions, DRCLUSTER_CONDITION_TYPE_FENCED)
                .unwrap()
                .observed_generation,
            Some(2)
        );
    }
}
