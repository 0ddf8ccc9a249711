use marquee_shared::Money;
use serde::Serialize;

/// What the patron is told a booking costs.
///
/// The client estimate is shown while the request is in flight; once the
/// service answers, its total replaces it. The two are never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub client_estimate: Money,
    pub server_total: Option<Money>,
}

impl PriceQuote {
    pub fn estimate(unit_price: Money, seats: usize) -> Self {
        let seats = u32::try_from(seats).unwrap_or(u32::MAX);
        Self {
            client_estimate: unit_price.times(seats),
            server_total: None,
        }
    }

    pub fn settle(self, server_total: Money) -> Self {
        Self {
            server_total: Some(server_total),
            ..self
        }
    }

    pub fn displayed(&self) -> Money {
        self.server_total.unwrap_or(self.client_estimate)
    }

    pub fn is_authoritative(&self) -> bool {
        self.server_total.is_some()
    }

    /// Server total minus the estimate, in cents.
    pub fn drift_cents(&self) -> Option<i64> {
        self.server_total
            .map(|total| total.cents() - self.client_estimate.cents())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_until_settled() {
        let quote = PriceQuote::estimate(Money::parse("5.00").unwrap(), 2);
        assert_eq!(quote.displayed().to_string(), "10.00");
        assert!(!quote.is_authoritative());
        assert_eq!(quote.drift_cents(), None);

        let settled = quote.settle(Money::parse("11.50").unwrap());
        assert_eq!(settled.displayed().to_string(), "11.50");
        assert_eq!(settled.client_estimate.to_string(), "10.00");
        assert_eq!(settled.drift_cents(), Some(150));
    }
}
