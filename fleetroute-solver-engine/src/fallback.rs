//! Deterministic nearest-neighbour construction.
//!
//! Vehicles are filled one at a time in fleet order. From the vehicle's last
//! stop the nearest unvisited customer whose visit keeps the route feasible
//! is appended; equally near customers go to the lowest node index. When no
//! customer fits, the route is closed and the next vehicle starts.
//!
//! Deliveries only become eligible once their pickup is on the current
//! route. A pickup whose delivery never follows is taken off the route again
//! and goes back to the pool with its delivery, so a later vehicle may still
//! serve the pair. Whatever is left once the fleet is exhausted is
//! unassigned.

use std::collections::BTreeSet;

use fleetroute_core::{
    MatrixResult, PickupDeliveryIndex, RouteSchedule, SolveRequest, Step, Vehicle,
};
use log::debug;

/// Routes built by [`nearest_neighbour`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Construction {
    /// `(vehicle_id, nodes)` for every vehicle serving a customer.
    pub routes: Vec<(String, Vec<usize>)>,
    /// Customers left off every route, in index order.
    pub unassigned: Vec<usize>,
}

/// The nearest feasible customer from the route's last stop.
fn nearest(
    schedule: &RouteSchedule<'_>,
    matrix: &MatrixResult,
    remaining: &BTreeSet<usize>,
) -> Option<(usize, Step)> {
    let from = schedule.last();
    let mut best: Option<(f64, usize, Step)> = None;
    for &node in remaining {
        let Some(distance) = matrix.distance(from, node) else {
            continue;
        };
        if best
            .as_ref()
            .is_some_and(|(nearest, _, _)| distance >= *nearest)
        {
            continue;
        }
        if let Ok(step) = schedule.evaluate(node) {
            best = Some((distance, node, step));
        }
    }
    best.map(|(_, node, step)| (node, step))
}

struct RouteBuilder<'r> {
    request: &'r SolveRequest,
    matrix: &'r MatrixResult,
    pairs: &'r PickupDeliveryIndex,
}

impl<'r> RouteBuilder<'r> {
    fn fill(&self, vehicle: &'r Vehicle, remaining: &mut BTreeSet<usize>) -> RouteSchedule<'r> {
        let mut schedule = RouteSchedule::new(self.request, self.matrix, self.pairs, vehicle);
        while let Some((node, step)) = nearest(&schedule, self.matrix, remaining) {
            schedule.apply(step);
            remaining.remove(&node);
        }
        schedule
    }

    /// Close `schedule`, first removing pickups whose delivery never came.
    ///
    /// Returns the closed route and every node taken off it.
    fn close(
        &self,
        vehicle: &'r Vehicle,
        mut schedule: RouteSchedule<'r>,
    ) -> (Option<Vec<usize>>, Vec<usize>) {
        let mut dropped: Vec<usize> = Vec::new();
        loop {
            let stranded = schedule.open_pickups().to_vec();
            if stranded.is_empty() {
                if schedule.is_empty() {
                    return (None, dropped);
                }
                let visits: Vec<usize> = schedule.nodes().iter().skip(1).copied().collect();
                return match schedule.close() {
                    Ok(nodes) => (Some(nodes), dropped),
                    Err(_) => {
                        dropped.extend(visits);
                        (None, dropped)
                    }
                };
            }
            dropped.extend(stranded);
            let kept: Vec<usize> = schedule
                .nodes()
                .iter()
                .skip(1)
                .filter(|node| !dropped.contains(node))
                .copied()
                .collect();
            schedule = RouteSchedule::new(self.request, self.matrix, self.pairs, vehicle);
            for node in kept {
                if schedule.push(node).is_err() {
                    dropped.push(node);
                }
            }
        }
    }
}

/// Build routes greedily for every vehicle in fleet order.
pub(crate) fn nearest_neighbour(request: &SolveRequest, matrix: &MatrixResult) -> Construction {
    let pairs = request.pairs();
    let builder = RouteBuilder {
        request,
        matrix,
        pairs: &pairs,
    };
    let mut remaining: BTreeSet<usize> = request.customer_nodes().into_iter().collect();
    let mut routes = Vec::new();

    for vehicle in &request.fleet {
        if remaining.is_empty() {
            break;
        }
        let schedule = builder.fill(vehicle, &mut remaining);
        if schedule.is_empty() {
            continue;
        }
        let (closed, dropped) = builder.close(vehicle, schedule);
        if !dropped.is_empty() {
            debug!(
                "vehicle `{}` returned {} stop(s) without a feasible pairing",
                vehicle.id,
                dropped.len()
            );
        }
        remaining.extend(dropped);
        if let Some(nodes) = closed {
            routes.push((vehicle.id.clone(), nodes));
        }
    }

    Construction {
        routes,
        unassigned: remaining.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetroute_core::test_support::{
        scenario_matrix, single_vehicle, timed_matrix, uniform_matrix,
    };
    use fleetroute_core::{Fleet, Load, TimeWindow};
    use rstest::rstest;

    fn scenario(capacity: u32) -> SolveRequest {
        SolveRequest::with_matrix("engine", scenario_matrix(), single_vehicle(capacity))
            .with_demands(vec![Load::zero(), Load::scalar(3), Load::scalar(4)])
    }

    fn build(request: &SolveRequest) -> Construction {
        let matrix = request.distance_matrix().expect("matrix present");
        nearest_neighbour(request, &matrix)
    }

    #[rstest]
    fn nearest_customer_comes_first() {
        let construction = build(&scenario(999));
        assert_eq!(
            construction.routes,
            vec![("van".to_owned(), vec![0, 2, 1, 0])]
        );
        assert!(construction.unassigned.is_empty());
    }

    #[rstest]
    fn ties_go_to_the_lowest_index() {
        let request =
            SolveRequest::with_matrix("engine", uniform_matrix(4, 7.0), single_vehicle(1));
        let construction = build(&request);
        assert_eq!(
            construction.routes,
            vec![("van".to_owned(), vec![0, 1, 2, 3, 0])]
        );
    }

    #[rstest]
    fn full_vehicle_hands_over_to_the_next() {
        let fleet = Fleet::new(vec![
            Vehicle::new("north", Load::scalar(4)),
            Vehicle::new("south", Load::scalar(4)),
        ])
        .expect("valid fleet");
        let request = SolveRequest::with_matrix("engine", scenario_matrix(), fleet)
            .with_demands(vec![Load::zero(), Load::scalar(3), Load::scalar(4)]);
        let construction = build(&request);
        assert_eq!(
            construction.routes,
            vec![
                ("north".to_owned(), vec![0, 2, 0]),
                ("south".to_owned(), vec![0, 1, 0]),
            ]
        );
    }

    #[rstest]
    fn leftovers_are_unassigned_when_vehicles_run_out() {
        let construction = build(&scenario(3));
        assert_eq!(construction.routes, vec![("van".to_owned(), vec![0, 1, 0])]);
        assert_eq!(construction.unassigned, vec![2]);
    }

    #[rstest]
    fn deliveries_wait_for_their_pickup() {
        let request = scenario(999).with_pairs(vec![(1, 2)]);
        let construction = build(&request);
        assert_eq!(
            construction.routes,
            vec![("van".to_owned(), vec![0, 1, 2, 0])]
        );
    }

    #[rstest]
    fn unreachable_windows_are_skipped() {
        let window = TimeWindow::new(0.0, 12.0).expect("valid window");
        let request = SolveRequest::with_matrix("engine", timed_matrix(), single_vehicle(9))
            .with_time_windows(vec![None, Some(window), None]);
        let construction = build(&request);
        assert_eq!(construction.routes, vec![("van".to_owned(), vec![0, 2, 0])]);
        assert_eq!(construction.unassigned, vec![1]);
    }

    #[rstest]
    fn stranded_pairs_stay_unassigned_without_another_vehicle() {
        let window = TimeWindow::new(0.0, 9.0).expect("valid window");
        let request = SolveRequest::with_matrix("engine", timed_matrix(), single_vehicle(9))
            .with_time_windows(vec![None, None, Some(window)])
            .with_pairs(vec![(1, 2)]);
        let construction = build(&request);
        assert!(construction.routes.is_empty());
        assert_eq!(construction.unassigned, vec![1, 2]);
    }

    #[rstest]
    fn stranded_pairs_move_to_the_next_vehicle() {
        let shift = TimeWindow::new(0.0, 20.0).expect("valid window");
        let fleet = Fleet::new(vec![
            Vehicle::new("early", Load::scalar(9)).with_time_window(shift),
            Vehicle::new("late", Load::scalar(9)),
        ])
        .expect("valid fleet");
        let request = SolveRequest::with_matrix("engine", timed_matrix(), fleet)
            .with_pairs(vec![(1, 2)]);
        let construction = build(&request);
        assert_eq!(
            construction.routes,
            vec![("late".to_owned(), vec![0, 1, 2, 0])]
        );
        assert!(construction.unassigned.is_empty());
    }
}
