//! Game counters exported in Prometheus text format

use crate::games::types::{Amount, CashOut};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct GameMetrics {
    rounds_started: AtomicU64,
    rounds_cashed_out: AtomicU64,
    rounds_forfeited: AtomicU64,
    rejected_actions: AtomicU64,
    wagered_minor: AtomicU64,
    paid_out_minor: AtomicU64,
    sessions_active: AtomicI64,
}

impl GameMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_round_started(&self, bet: Amount) {
        self.rounds_started.fetch_add(1, Ordering::SeqCst);
        self.wagered_minor.fetch_add(bet.minor(), Ordering::SeqCst);
    }

    pub fn record_cash_out(&self, cash: &CashOut) {
        self.rounds_cashed_out.fetch_add(1, Ordering::SeqCst);
        self.paid_out_minor
            .fetch_add(cash.winnings.minor(), Ordering::SeqCst);
    }

    pub fn record_forfeit(&self) {
        self.rounds_forfeited.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_rejection(&self) {
        self.rejected_actions.fetch_add(1, Ordering::SeqCst);
    }

    pub fn session_opened(&self) {
        self.sessions_active.fetch_add(1, Ordering::SeqCst);
    }

    pub fn session_closed(&self) {
        self.sessions_active.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn rounds_started(&self) -> u64 {
        self.rounds_started.load(Ordering::SeqCst)
    }

    /// Paid out over wagered, 0 before any wager
    pub fn return_to_player(&self) -> f64 {
        let wagered = self.wagered_minor.load(Ordering::SeqCst);
        if wagered == 0 {
            return 0.0;
        }
        self.paid_out_minor.load(Ordering::SeqCst) as f64 / wagered as f64
    }

    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        let counters = [
            ("ascent_rounds_started_total", "Rounds opened", self.rounds_started.load(Ordering::SeqCst)),
            ("ascent_rounds_cashed_out_total", "Rounds closed by a valid cash-out", self.rounds_cashed_out.load(Ordering::SeqCst)),
            ("ascent_rounds_forfeited_total", "Rounds closed as a loss", self.rounds_forfeited.load(Ordering::SeqCst)),
            ("ascent_rejected_actions_total", "Rejected game actions", self.rejected_actions.load(Ordering::SeqCst)),
        ];
        for (name, help, value) in counters {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n\n"
            ));
        }

        output.push_str(&format!(
            "# HELP ascent_wagered_total Total amount wagered\n\
             # TYPE ascent_wagered_total counter\n\
             ascent_wagered_total {}\n\n",
            Amount::from_minor(self.wagered_minor.load(Ordering::SeqCst))
        ));

        output.push_str(&format!(
            "# HELP ascent_paid_out_total Total amount paid out\n\
             # TYPE ascent_paid_out_total counter\n\
             ascent_paid_out_total {}\n\n",
            Amount::from_minor(self.paid_out_minor.load(Ordering::SeqCst))
        ));

        output.push_str(&format!(
            "# HELP ascent_sessions_active Live player sessions\n\
             # TYPE ascent_sessions_active gauge\n\
             ascent_sessions_active {}\n",
            self.sessions_active.load(Ordering::SeqCst)
        ));

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_rtp() {
        let metrics = GameMetrics::new();
        assert_eq!(metrics.return_to_player(), 0.0);

        metrics.record_round_started(Amount::from_minor(10_000));
        metrics.record_cash_out(&CashOut {
            winnings: Amount::from_minor(15_000),
            balance: Amount::from_minor(105_000),
            multiplier: 1.5,
        });
        metrics.record_round_started(Amount::from_minor(10_000));
        metrics.record_forfeit();

        assert_eq!(metrics.rounds_started(), 2);
        assert_eq!(metrics.return_to_player(), 0.75);

        let text = metrics.to_prometheus_format();
        assert!(text.contains("ascent_rounds_started_total 2"));
        assert!(text.contains("ascent_rounds_forfeited_total 1"));
        assert!(text.contains("ascent_wagered_total 200.00"));
        assert!(text.contains("ascent_paid_out_total 150.00"));
    }
}
