//! Single-station plausibility checks
//!
//! Runs before the spatial detector and decides the starting quality of
//! every station: missing, syntactically wrong, or accepted for the
//! spatial test.

use crate::config::SyntacticRanges;
use crate::models::{MeteoVariable, Quality, Station};
use tracing::debug;

/// Syntactic quality control collaborator
///
/// Implementations set each active station's quality to `MissingData`,
/// `WrongSyntactic` or `Accepted` from its `current_value`.
pub trait SyntacticQualityControl {
    fn syntactic_quality_control(&self, variable: MeteoVariable, stations: &mut [Station]);
}

/// Range check against physical plausibility limits per variable family
#[derive(Debug, Clone, Default)]
pub struct RangeQualityControl {
    ranges: SyntacticRanges,
}

impl RangeQualityControl {
    pub fn new(ranges: SyntacticRanges) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &SyntacticRanges {
        &self.ranges
    }
}

impl SyntacticQualityControl for RangeQualityControl {
    fn syntactic_quality_control(&self, variable: MeteoVariable, stations: &mut [Station]) {
        let range = self.ranges.for_family(variable.family());
        let mut rejected = 0;

        for station in stations.iter_mut().filter(|station| station.active) {
            station.quality = match (station.current_value, range) {
                (None, _) => Quality::MissingData,
                (Some(value), Some(range)) if !range.contains(value) => {
                    rejected += 1;
                    Quality::WrongSyntactic
                }
                (Some(_), _) => Quality::Accepted,
            };
        }

        if rejected > 0 {
            debug!(
                "Syntactic QC rejected {} of {} {} values",
                rejected,
                stations.len(),
                variable
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValueRange;
    use crate::models::GeoPoint;

    fn station_with(value: Option<f64>) -> Station {
        let mut station = Station::new("S", "test", GeoPoint::new(0.0, 0.0, 0.0));
        station.current_value = value;
        station
    }

    #[test]
    fn test_range_classification() {
        let qc = RangeQualityControl::default();
        let mut stations = vec![
            station_with(None),
            station_with(Some(75.0)),
            station_with(Some(21.5)),
            station_with(Some(-60.0)),
        ];

        qc.syntactic_quality_control(MeteoVariable::AirTemperature, &mut stations);

        assert_eq!(stations[0].quality, Quality::MissingData);
        assert_eq!(stations[1].quality, Quality::WrongSyntactic);
        assert_eq!(stations[2].quality, Quality::Accepted);
        // Range bounds are inclusive
        assert_eq!(stations[3].quality, Quality::Accepted);
    }

    #[test]
    fn test_negative_precipitation_rejected() {
        let qc = RangeQualityControl::default();
        let mut stations = vec![station_with(Some(-0.1)), station_with(Some(0.0))];

        qc.syntactic_quality_control(MeteoVariable::Precipitation, &mut stations);

        assert_eq!(stations[0].quality, Quality::WrongSyntactic);
        assert_eq!(stations[1].quality, Quality::Accepted);
    }

    #[test]
    fn test_custom_ranges_and_unbounded_family() {
        let ranges = SyntacticRanges {
            temperature: ValueRange::new(-10.0, 10.0),
            ..Default::default()
        };
        let qc = RangeQualityControl::new(ranges);
        let mut stations = vec![station_with(Some(15.0))];

        qc.syntactic_quality_control(MeteoVariable::AirTemperature, &mut stations);
        assert_eq!(stations[0].quality, Quality::WrongSyntactic);

        // Other-family variables only get the missing-value check
        let mut stations = vec![station_with(Some(1.0e6))];
        qc.syntactic_quality_control(MeteoVariable::LeafWetness, &mut stations);
        assert_eq!(stations[0].quality, Quality::Accepted);
    }

    #[test]
    fn test_inactive_stations_untouched() {
        let qc = RangeQualityControl::default();
        let mut inactive = station_with(Some(99.0));
        inactive.active = false;
        let mut stations = vec![inactive, station_with(Some(99.0))];

        qc.syntactic_quality_control(MeteoVariable::AirTemperature, &mut stations);

        assert_eq!(stations[0].quality, Quality::NotYetChecked);
        assert_eq!(stations[1].quality, Quality::WrongSyntactic);
    }
}
