//! Route totals and emissions enrichment.
//!
//! Backends report aggregates inconsistently, so every total is recomputed
//! from the matrix along the route's node sequence. Enrichment only adds
//! figures; it never reorders or drops stops.

use std::collections::BTreeMap;

use log::warn;

use crate::{MatrixResult, Route, RoutesResult, SolveRequest};

/// Default emission factor in kilograms of CO2 per kilometre.
pub const DEFAULT_KG_PER_KM: f64 = 0.2;

/// Sum distance and duration along consecutive pairs of `nodes`.
///
/// Pairs outside the matrix contribute nothing and are logged. Duration is
/// `None` when the matrix has no durations.
#[must_use]
pub fn route_totals(nodes: &[usize], matrix: &MatrixResult) -> (f64, Option<f64>) {
    let mut distance = 0.0;
    let mut duration = matrix.durations().map(|_| 0.0);
    for leg in nodes.windows(2) {
        let [from, to] = *leg else { continue };
        match matrix.distance(from, to) {
            Some(metres) => distance += metres,
            None => warn!("route leg {from}->{to} is outside the matrix"),
        }
        if let Some(total) = duration.as_mut() {
            *total += matrix.duration(from, to).unwrap_or(0.0);
        }
    }
    (distance, duration)
}

/// Emission factors per vehicle class.
///
/// # Examples
///
/// ```
/// use fleetroute_core::EmissionFactors;
///
/// let factors = EmissionFactors::default().with_class("cargo-bike", 0.0);
/// assert_eq!(factors.factor(Some("cargo-bike")), 0.0);
/// assert_eq!(factors.factor(Some("van")), 0.2);
/// assert_eq!(factors.factor(None), 0.2);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EmissionFactors {
    /// Factor for vehicles with no class or an unknown class.
    pub default_kg_per_km: f64,
    /// Factor per vehicle class.
    pub by_class: BTreeMap<String, f64>,
}

impl Default for EmissionFactors {
    fn default() -> Self {
        Self {
            default_kg_per_km: DEFAULT_KG_PER_KM,
            by_class: BTreeMap::new(),
        }
    }
}

impl EmissionFactors {
    /// Set the factor for `class`.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>, kg_per_km: f64) -> Self {
        self.by_class.insert(class.into(), kg_per_km);
        self
    }

    /// Set the fallback factor.
    #[must_use]
    pub const fn with_default(mut self, kg_per_km: f64) -> Self {
        self.default_kg_per_km = kg_per_km;
        self
    }

    /// Factor for `class`, falling back to the default.
    #[must_use]
    pub fn factor(&self, class: Option<&str>) -> f64 {
        class
            .and_then(|name| self.by_class.get(name))
            .copied()
            .unwrap_or(self.default_kg_per_km)
    }

    /// Emissions for `distance_m` metres driven by a vehicle of `class`.
    #[must_use]
    pub fn estimate(&self, distance_m: f64, class: Option<&str>) -> f64 {
        distance_m / 1000.0 * self.factor(class)
    }
}

/// Recompute totals for every route and, with `factors`, add emissions.
///
/// Returns a new result; the input is left untouched.
#[must_use]
pub fn enrich(
    result: &RoutesResult,
    request: &SolveRequest,
    matrix: &MatrixResult,
    factors: Option<&EmissionFactors>,
) -> RoutesResult {
    let routes = result
        .routes
        .iter()
        .map(|route| {
            let (total_distance, total_duration) = route_totals(&route.nodes, matrix);
            let emissions_kg = factors.map(|table| {
                let class = request
                    .fleet
                    .iter()
                    .find(|vehicle| vehicle.id == route.vehicle_id)
                    .and_then(|vehicle| vehicle.class.as_deref());
                table.estimate(total_distance, class)
            });
            Route {
                total_distance,
                total_duration,
                emissions_kg: emissions_kg.or(route.emissions_kg),
                ..route.clone()
            }
        })
        .collect();
    RoutesResult {
        routes,
        ..result.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scenario_matrix, single_vehicle, timed_matrix};
    use crate::{Diagnostics, Fleet, Load, SolveStatus, Vehicle};
    use rstest::rstest;

    fn routed(request: &SolveRequest, total_distance: f64) -> RoutesResult {
        RoutesResult {
            status: SolveStatus::Success,
            message: String::new(),
            routes: vec![Route {
                vehicle_id: request
                    .fleet
                    .vehicles()
                    .first()
                    .map(|v| v.id.clone())
                    .unwrap_or_default(),
                stops: vec!["0".into(), "1".into(), "2".into(), "0".into()],
                nodes: vec![0, 1, 2, 0],
                total_distance,
                total_duration: None,
                emissions_kg: None,
            }],
            unassigned: Vec::new(),
            diagnostics: Diagnostics::new("test"),
        }
    }

    #[rstest]
    fn totals_sum_matrix_entries() {
        assert_eq!(route_totals(&[0, 1, 2, 0], &scenario_matrix()), (12.0, None));
        assert_eq!(route_totals(&[0, 1, 2, 0], &timed_matrix()), (12.0, Some(24.0)));
        assert_eq!(route_totals(&[0], &scenario_matrix()), (0.0, None));
    }

    #[rstest]
    fn backend_totals_are_replaced() {
        let request = SolveRequest::with_matrix("test", scenario_matrix(), single_vehicle(9));
        let enriched = enrich(&routed(&request, 999.0), &request, &scenario_matrix(), None);
        let route = enriched.routes.first().expect("route kept");
        assert_eq!(route.total_distance, 12.0);
        assert_eq!(route.nodes, vec![0, 1, 2, 0]);
        assert_eq!(route.emissions_kg, None);
    }

    #[rstest]
    fn emissions_use_vehicle_class() {
        let fleet = Fleet::new(vec![Vehicle::new("ev", Load::scalar(9)).with_class("electric")])
            .expect("valid fleet");
        let request = SolveRequest::with_matrix("test", scenario_matrix(), fleet);
        let factors = EmissionFactors::default().with_class("electric", 0.05);
        let enriched = enrich(
            &routed(&request, 0.0),
            &request,
            &scenario_matrix(),
            Some(&factors),
        );
        let emissions = enriched
            .routes
            .first()
            .and_then(|route| route.emissions_kg)
            .expect("emissions computed");
        assert!((emissions - 12.0 / 1000.0 * 0.05).abs() < 1e-12);
    }
}
