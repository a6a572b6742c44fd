use serde::{Deserialize, Serialize};

use crate::models::TicketRecord;

/// Project-wide sums of the ticket numeric fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectTotals {
    pub total_crew_max: f64,
    pub total_crew_min: f64,
    pub total_crew_best_hours: f64,
    pub total_crew_worst_hours: f64,
    pub total_sqft: f64,
    /// `(total_crew_max + total_crew_min) / 2`.
    pub mean_crew: f64,
}

impl ProjectTotals {
    /// Name of the first total that is not a finite number, if any.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("total_crew_max", self.total_crew_max),
            ("total_crew_min", self.total_crew_min),
            ("total_crew_best_hours", self.total_crew_best_hours),
            ("total_crew_worst_hours", self.total_crew_worst_hours),
            ("total_sqft", self.total_sqft),
            ("mean_crew", self.mean_crew),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(name, _)| name)
    }
}

/// Fold tickets into project totals.
///
/// An empty project yields all zeros.
pub fn aggregate<'a>(tickets: impl IntoIterator<Item = &'a TicketRecord>) -> ProjectTotals {
    let mut totals = tickets
        .into_iter()
        .fold(ProjectTotals::default(), |mut acc, t| {
            acc.total_crew_max += t.crew_max;
            acc.total_crew_min += t.crew_min;
            acc.total_crew_best_hours += t.crew_best_hours;
            acc.total_crew_worst_hours += t.crew_worst_hours;
            acc.total_sqft += t.sqft;
            acc
        });
    totals.mean_crew = (totals.total_crew_max + totals.total_crew_min) / 2.0;
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;

    fn ticket(crew_max: f64, crew_min: f64, sqft: f64) -> TicketRecord {
        TicketRecord {
            crew_max,
            crew_min,
            crew_best_hours: 8.0,
            crew_worst_hours: 12.0,
            sqft,
            line_items: vec![LineItem::None; 8],
        }
    }

    #[test]
    fn overflowing_sum_is_reported() {
        let totals = aggregate(&[ticket(1.0, 1.0, 1e308), ticket(1.0, 1.0, 1e308)]);
        assert_eq!(totals.first_non_finite(), Some("total_sqft"));
        assert_eq!(aggregate(&[ticket(1.0, 1.0, 1e308)]).first_non_finite(), None);
    }

    #[test]
    fn mean_crew_overflow_is_reported() {
        let totals = aggregate(&[ticket(f64::MAX, f64::MAX, 1.0)]);
        assert_eq!(totals.first_non_finite(), Some("mean_crew"));
    }

    #[test]
    fn empty_project_is_all_zero() {
        assert_eq!(aggregate(&[] as &[TicketRecord]), ProjectTotals::default());
    }

    #[test]
    fn sums_every_field() {
        let totals = aggregate(&[ticket(5.0, 3.0, 100.0), ticket(2.0, 2.0, 50.0)]);
        assert_eq!(totals.total_crew_max, 7.0);
        assert_eq!(totals.total_crew_min, 5.0);
        assert_eq!(totals.total_crew_best_hours, 16.0);
        assert_eq!(totals.total_crew_worst_hours, 24.0);
        assert_eq!(totals.total_sqft, 150.0);
        assert_eq!(totals.mean_crew, 6.0);
    }
}
