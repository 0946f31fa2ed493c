//! Attachment size planning.
//!
//! A budget is split greedily into cap-sized chunks with the remainder last:
//!
//! ```text
//! total = 5, cap = 2  =>  [2, 2, 1]
//! total = 8, cap = 2  =>  [2, 2, 2, 2]
//! ```
//!
//! All sizes are whole bytes, so the sum of a plan is exact and never drifts
//! above the budget.

/// Bytes in one mebibyte. Every "MB" on the command line means MiB.
pub const MIB: u64 = 1024 * 1024;

/// Absolute ceiling for a single attachment (2 MiB).
pub const MAX_PER_ATTACHMENT_BYTES: u64 = 2 * MIB;

/// Absolute ceiling for all attachments of one document (10 MiB).
pub const MAX_TOTAL_ATTACHMENTS_BYTES: u64 = 10 * MIB;

/// Smallest budget accepted for either input (0.001 MiB).
pub const MIN_ATTACHMENT_BYTES: u64 = MIB / 1000;

/// Convert a MiB quantity from the command line into bytes.
///
/// Negative, zero and non-finite inputs map to zero.
pub fn mb_to_bytes(mb: f64) -> u64 {
    if !mb.is_finite() || mb <= 0.0 {
        return 0;
    }
    (mb * MIB as f64) as u64
}

/// Convert bytes into MiB.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / MIB as f64
}

/// Ceilings applied to the budget before it is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentLimits {
    /// Largest allowed single attachment.
    pub max_per_attachment: u64,
    /// Largest allowed sum of attachments.
    pub max_total: u64,
    /// Floor for both inputs.
    pub min_attachment: u64,
}

impl Default for AttachmentLimits {
    fn default() -> Self {
        Self {
            max_per_attachment: MAX_PER_ATTACHMENT_BYTES,
            max_total: MAX_TOTAL_ATTACHMENTS_BYTES,
            min_attachment: MIN_ATTACHMENT_BYTES,
        }
    }
}

impl AttachmentLimits {
    /// Clamp a (per-attachment cap, total budget) pair into the configured
    /// ceilings. Returns `(per_cap, total)`.
    pub fn clamp(&self, per_cap: u64, total: u64) -> (u64, u64) {
        let clamp = |value: u64, ceiling: u64| {
            value.clamp(self.min_attachment.min(ceiling), ceiling)
        };
        (
            clamp(per_cap, self.max_per_attachment),
            clamp(total, self.max_total),
        )
    }

    /// Clamp the inputs and split the total budget into per-attachment sizes.
    ///
    /// Every planned size lies in `[min_attachment, per_cap]`. A remainder
    /// below the floor is dropped: the chunks before it are already at the
    /// cap, so it cannot be folded into them.
    pub fn plan(&self, total: u64, per_cap: u64) -> AttachmentPlan {
        let (per_cap, total) = self.clamp(per_cap, total);
        let mut plan = split_budget(total, per_cap);
        if plan.sizes.len() > 1 && plan.sizes.last().is_some_and(|&s| s < self.min_attachment) {
            plan.sizes.pop();
        }
        plan
    }
}

/// Ordered attachment sizes in bytes, largest first, remainder last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentPlan {
    sizes: Vec<u64>,
}

impl AttachmentPlan {
    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Sum of all planned sizes in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.sizes.iter().sum()
    }

    /// Sum of all planned sizes in MiB, rounded to three decimals.
    pub fn total_mb(&self) -> f64 {
        (bytes_to_mb(self.total_bytes()) * 1000.0).round() / 1000.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.sizes.iter().copied()
    }
}

/// Split `total` into chunks of at most `cap`, without clamping.
///
/// A zero total or a zero cap yields an empty plan.
pub fn split_budget(total: u64, cap: u64) -> AttachmentPlan {
    if total == 0 || cap == 0 {
        return AttachmentPlan::default();
    }

    let full_chunks = total / cap;
    let remainder = total % cap;

    let mut sizes = Vec::with_capacity(full_chunks as usize + 1);
    sizes.extend(std::iter::repeat(cap).take(full_chunks as usize));
    if remainder > 0 {
        sizes.push(remainder);
    }

    AttachmentPlan { sizes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_with_remainder() {
        assert_eq!(split_budget(5, 2).sizes(), &[2, 2, 1]);
    }

    #[test]
    fn test_plan_drops_remainder_below_floor() {
        let plan = AttachmentLimits::default().plan(2 * MIB + 1, 2 * MIB);
        assert_eq!(plan.sizes(), &[2 * MIB]);

        let plan = AttachmentLimits::default().plan(2 * MIB + MIN_ATTACHMENT_BYTES, 2 * MIB);
        assert_eq!(plan.sizes(), &[2 * MIB, MIN_ATTACHMENT_BYTES]);
    }

    #[test]
    fn test_split_exact_multiple() {
        assert_eq!(split_budget(8, 2).sizes(), &[2, 2, 2, 2]);
    }

    #[test]
    fn test_split_total_below_cap() {
        assert_eq!(split_budget(1, 2).sizes(), &[1]);
    }

    #[test]
    fn test_split_zero_inputs() {
        assert!(split_budget(0, 2).is_empty());
        assert!(split_budget(5, 0).is_empty());
    }

    #[test]
    fn test_limits_clamp_to_ceilings() {
        let limits = AttachmentLimits::default();
        let (per_cap, total) = limits.clamp(5 * MIB, 50 * MIB);
        assert_eq!(per_cap, MAX_PER_ATTACHMENT_BYTES);
        assert_eq!(total, MAX_TOTAL_ATTACHMENTS_BYTES);

        let (per_cap, total) = limits.clamp(0, 0);
        assert_eq!(per_cap, MIN_ATTACHMENT_BYTES);
        assert_eq!(total, MIN_ATTACHMENT_BYTES);
    }

    #[test]
    fn test_limits_plan_defaults() {
        let plan = AttachmentLimits::default().plan(mb_to_bytes(5.0), mb_to_bytes(2.0));
        assert_eq!(plan.sizes(), &[2 * MIB, 2 * MIB, MIB]);
        assert_eq!(plan.total_mb(), 5.0);
    }

    #[test]
    fn test_limits_plan_over_ceiling() {
        // 12 MiB requested is capped at 10 MiB, in 2 MiB pieces.
        let plan = AttachmentLimits::default().plan(mb_to_bytes(12.0), mb_to_bytes(3.0));
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.total_bytes(), MAX_TOTAL_ATTACHMENTS_BYTES);
    }

    #[test]
    fn test_mb_conversions() {
        assert_eq!(mb_to_bytes(2.0), 2 * MIB);
        assert_eq!(mb_to_bytes(-1.0), 0);
        assert_eq!(mb_to_bytes(f64::NAN), 0);
        assert_eq!(bytes_to_mb(MIB / 2), 0.5);
    }

    proptest! {
        #[test]
        fn prop_plan_within_budget(total in 1u64..100_000_000, cap in 1u64..10_000_000) {
            let plan = split_budget(total, cap);
            prop_assert!(plan.total_bytes() <= total);
            prop_assert!(plan.iter().all(|s| s <= cap && s > 0));
        }

        #[test]
        fn prop_plan_is_exact_and_largest_first(total in 1u64..100_000_000, cap in 1u64..10_000_000) {
            let plan = split_budget(total, cap);
            prop_assert_eq!(plan.total_bytes(), total);
            prop_assert!(plan.sizes().windows(2).all(|w| w[0] >= w[1]));
        }

        #[test]
        fn prop_clamped_plan_respects_ceilings(total in 0u64..(20 * MIB), cap in 0u64..(4 * MIB)) {
            let plan = AttachmentLimits::default().plan(total, cap);
            prop_assert!(plan.total_bytes() <= MAX_TOTAL_ATTACHMENTS_BYTES);
            prop_assert!(plan.iter().all(|s| s <= MAX_PER_ATTACHMENT_BYTES));
            prop_assert!(plan.iter().all(|s| s >= MIN_ATTACHMENT_BYTES));
        }
    }
}
