//! Spend-limit policy for outbound payments.
//!
//! The guard enforces two caps in display units: a per-transaction maximum
//! and a running daily total. It is consulted before any funds move. The
//! daily counter's read-then-write is serialized behind a mutex so two
//! concurrent attempts cannot both pass a check that, combined, exceeds the
//! cap. The daily window rolls over at the UTC calendar-day boundary.

use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::proto::UnixTimestamp;

/// Spend caps in display units. `None` means uncapped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpendLimits {
    /// Maximum amount for a single payment.
    pub per_transaction: Option<Decimal>,
    /// Maximum total spend within one UTC day.
    pub daily: Option<Decimal>,
}

impl SpendLimits {
    /// Limits that never reject.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            per_transaction: None,
            daily: None,
        }
    }
}

/// A spend-limit rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LimitViolation {
    /// The amount exceeds the per-transaction cap.
    #[error(
        "payment of {amount} exceeds the per-transaction limit of {cap}. \
         Raise the limit if this payment is intentional."
    )]
    PerTransaction {
        /// The requested display amount.
        amount: Decimal,
        /// The configured cap.
        cap: Decimal,
    },
    /// The amount would push today's total over the daily cap.
    #[error(
        "payment of {amount} would exceed the daily limit of {cap} \
         ({spent} already spent today)"
    )]
    Daily {
        /// The requested display amount.
        amount: Decimal,
        /// The configured cap.
        cap: Decimal,
        /// Amount already spent in the current window.
        spent: Decimal,
    },
}

/// Running state of the daily spend window.
#[derive(Debug, Clone, Copy)]
struct DayWindow {
    day: u64,
    spent: Decimal,
}

/// Policy guard consulted before every transfer attempt.
///
/// `check_and_reserve` validates both caps and accrues the amount into the
/// daily window in one critical section; callers release the reservation if
/// the payment fails before funds are committed.
#[derive(Debug)]
pub struct SpendLimitGuard {
    limits: SpendLimits,
    window: Mutex<DayWindow>,
}

impl SpendLimitGuard {
    /// Creates a guard with the given caps.
    #[must_use]
    pub fn new(limits: SpendLimits) -> Self {
        Self {
            limits,
            window: Mutex::new(DayWindow {
                day: UnixTimestamp::now().days_since_epoch(),
                spent: Decimal::ZERO,
            }),
        }
    }

    /// A guard that never rejects.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(SpendLimits::unlimited())
    }

    /// Returns the configured caps.
    #[must_use]
    pub const fn limits(&self) -> &SpendLimits {
        &self.limits
    }

    /// Validates `amount` against both caps and reserves it against the
    /// daily total.
    ///
    /// # Errors
    ///
    /// Returns a [`LimitViolation`] naming the violated cap and headroom.
    pub async fn check_and_reserve(&self, amount: Decimal) -> Result<(), LimitViolation> {
        self.check_and_reserve_at(amount, UnixTimestamp::now()).await
    }

    /// Returns a previously reserved amount after a payment failed before
    /// funds were committed.
    pub async fn release(&self, amount: Decimal) {
        self.release_at(amount, UnixTimestamp::now()).await;
    }

    /// Amount spent (or reserved) so far in the current daily window.
    pub async fn spent_today(&self) -> Decimal {
        let mut window = self.window.lock().await;
        Self::roll_over(&mut window, UnixTimestamp::now());
        window.spent
    }

    async fn check_and_reserve_at(
        &self,
        amount: Decimal,
        now: UnixTimestamp,
    ) -> Result<(), LimitViolation> {
        if let Some(cap) = self.limits.per_transaction
            && amount > cap
        {
            return Err(LimitViolation::PerTransaction { amount, cap });
        }

        let mut window = self.window.lock().await;
        Self::roll_over(&mut window, now);
        if let Some(cap) = self.limits.daily
            && window.spent + amount > cap
        {
            return Err(LimitViolation::Daily {
                amount,
                cap,
                spent: window.spent,
            });
        }
        window.spent += amount;
        Ok(())
    }

    async fn release_at(&self, amount: Decimal, now: UnixTimestamp) {
        let mut window = self.window.lock().await;
        Self::roll_over(&mut window, now);
        window.spent = (window.spent - amount).max(Decimal::ZERO);
    }

    fn roll_over(window: &mut DayWindow, now: UnixTimestamp) {
        let today = now.days_since_epoch();
        if window.day != today {
            window.day = today;
            window.spent = Decimal::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn guard(per_tx: &str, daily: &str) -> SpendLimitGuard {
        SpendLimitGuard::new(SpendLimits {
            per_transaction: Some(per_tx.parse().unwrap()),
            daily: Some(daily.parse().unwrap()),
        })
    }

    #[tokio::test]
    async fn rejects_over_per_transaction_cap() {
        let guard = guard("1.00", "10.00");
        let err = guard
            .check_and_reserve("1.01".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, LimitViolation::PerTransaction { .. }));
        assert_eq!(guard.spent_today().await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn accrues_daily_total_across_payments() {
        let guard = guard("5.00", "10.00");
        for _ in 0..4 {
            guard
                .check_and_reserve("2.50".parse().unwrap())
                .await
                .unwrap();
        }
        let err = guard
            .check_and_reserve("0.01".parse().unwrap())
            .await
            .unwrap_err();
        match err {
            LimitViolation::Daily { spent, .. } => assert_eq!(spent, "10.00".parse().unwrap()),
            other => panic!("expected daily violation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn release_returns_headroom() {
        let guard = guard("5.00", "5.00");
        guard
            .check_and_reserve("5.00".parse().unwrap())
            .await
            .unwrap();
        guard.release("5.00".parse().unwrap()).await;
        guard
            .check_and_reserve("5.00".parse().unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn window_rolls_over_at_day_boundary() {
        let guard = guard("5.00", "5.00");
        let yesterday = UnixTimestamp::from_secs(0);
        let today = UnixTimestamp::from_secs(86_400);
        guard
            .check_and_reserve_at("5.00".parse().unwrap(), yesterday)
            .await
            .unwrap();
        guard
            .check_and_reserve_at("5.00".parse().unwrap(), today)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_reservations_never_exceed_daily_cap() {
        let guard = Arc::new(guard("1.00", "5.00"));
        let mut tasks = Vec::new();
        for _ in 0..20 {
            let guard = Arc::clone(&guard);
            tasks.push(tokio::spawn(async move {
                guard.check_and_reserve("1.00".parse().unwrap()).await.is_ok()
            }));
        }
        let mut passed = 0;
        for task in tasks {
            if task.await.unwrap() {
                passed += 1;
            }
        }
        assert_eq!(passed, 5);
        assert_eq!(guard.spent_today().await, "5.00".parse().unwrap());
    }
}
