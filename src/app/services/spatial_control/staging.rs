//! Point staging for interpolation
//!
//! Projects active, accepted stations into the point set consumed by the
//! interpolation backend and records the set's extent in the settings.

use crate::config::InterpolationSettings;
use crate::models::{InterpolationDataPoint, Station, check_lapse_rate_code, is_selection_active};
use tracing::debug;

/// Running extent of the staged points
#[derive(Debug, Clone, Copy)]
struct Extent {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    value_min: f64,
    value_max: f64,
}

impl Extent {
    fn new(point: &InterpolationDataPoint) -> Self {
        Self {
            x_min: point.point.utm_x,
            x_max: point.point.utm_x,
            y_min: point.point.utm_y,
            y_max: point.point.utm_y,
            value_min: point.value,
            value_max: point.value,
        }
    }

    fn include(&mut self, point: &InterpolationDataPoint) {
        self.x_min = self.x_min.min(point.point.utm_x);
        self.x_max = self.x_max.max(point.point.utm_x);
        self.y_min = self.y_min.min(point.point.utm_y);
        self.y_max = self.y_max.max(point.point.utm_y);
        self.value_min = self.value_min.min(point.value);
        self.value_max = self.value_max.max(point.value);
    }

    fn area(&self) -> f64 {
        (self.x_max - self.x_min) * (self.y_max - self.y_min)
    }
}

/// Stage accepted station values into `points`
///
/// `points` is cleared first. A station is staged when it is active, its
/// quality is `Accepted`, and either no station is selected or this one is.
///
/// # Returns
///
/// `false` when none of the staged points passes the lapse-rate
/// admissibility check; the point set is left built but should be treated
/// as empty, and the settings are not updated. Otherwise the bounding-box
/// area and value range are written to `settings` and `true` is returned.
pub fn pass_data_to_interpolation(
    stations: &[Station],
    points: &mut Vec<InterpolationDataPoint>,
    settings: &mut InterpolationSettings,
) -> bool {
    let selection_active = is_selection_active(stations);
    let mut extent: Option<Extent> = None;
    let mut nr_valid = 0;

    points.clear();

    for (index, station) in stations.iter().enumerate() {
        if !station.active || !station.is_accepted() || (selection_active && !station.selected) {
            continue;
        }

        let Some(value) = station.current_value else {
            debug!("Station {} accepted without a current value, not staged", station.id);
            continue;
        };

        let point = InterpolationDataPoint::from_station(index, station, value);

        match extent.as_mut() {
            Some(extent) => extent.include(&point),
            None => extent = Some(Extent::new(&point)),
        }

        if check_lapse_rate_code(point.lapse_rate_code, settings.use_lapse_rate_code, false) {
            nr_valid += 1;
        }

        points.push(point);
    }

    let extent = match extent {
        Some(extent) if nr_valid > 0 => extent,
        _ => {
            debug!(
                "Staging found no admissible points ({} staged, selection active: {})",
                points.len(),
                selection_active
            );
            return false;
        }
    };

    settings.set_points_bounding_box_area(extent.area());
    settings.set_points_range(extent.value_min, extent.value_max);

    debug!(
        "Staged {} points ({} admissible), bounding box area {:.0} m², range [{}, {}]",
        points.len(),
        nr_valid,
        extent.area(),
        extent.value_min,
        extent.value_max
    );

    true
}
