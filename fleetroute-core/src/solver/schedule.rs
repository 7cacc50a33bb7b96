//! Incremental route feasibility.
//!
//! [`RouteSchedule`] extends a route one node at a time while tracking
//! load, elapsed time and open pickups, rejecting any step that would break
//! capacity, a time window or pickup-delivery precedence. Solvers use it to
//! construct routes and tests use [`check_route`] to audit them.
//!
//! Load model: single nodes are served from goods loaded at the start, so
//! the route's opening load is the sum of their demands and it drops at each
//! visit. A pair's load is picked up at the pickup and dropped at the
//! delivery. Adding a single node therefore raises the load at every earlier
//! point of the route by its demand.
//!
//! Time model: arrival is departure plus travel duration, service starts at
//! the later of arrival and window start, arriving after the window end is
//! infeasible, and departure is service start plus service time. The
//! vehicle leaves its start node at its shift start and must reach its end
//! node by its shift end.

use std::collections::BTreeSet;

use log::warn;
use thiserror::Error;

use super::request::{PairRole, PickupDeliveryIndex};
use crate::{Load, MatrixResult, SolveRequest, Vehicle};

/// Why a route step was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteViolation {
    /// The route does not begin and end at the vehicle's anchors.
    #[error("route must start at node {start} and end at node {end}")]
    Anchors {
        /// Expected start node.
        start: usize,
        /// Expected end node.
        end: usize,
    },
    /// The node is not in the matrix.
    #[error("node {node} is out of range")]
    UnknownNode {
        /// Offending node.
        node: usize,
    },
    /// The node is already on the route.
    #[error("node {node} is visited twice")]
    Revisit {
        /// Offending node.
        node: usize,
    },
    /// Visiting the node overloads the vehicle.
    #[error("visiting node {node} exceeds vehicle capacity")]
    Capacity {
        /// Offending node.
        node: usize,
    },
    /// The vehicle arrives after the node's window closes.
    #[error("arrival at node {node} ({arrival}s) is after its window closes")]
    Late {
        /// Offending node.
        node: usize,
        /// Arrival time in seconds.
        arrival: f64,
    },
    /// The vehicle cannot get back to its end node within its shift.
    #[error("vehicle cannot return to node {end} before its shift ends")]
    Shift {
        /// End node.
        end: usize,
    },
    /// A delivery is visited before its pickup is on the route.
    #[error("delivery {delivery} visited before pickup {pickup}")]
    Precedence {
        /// Pickup node.
        pickup: usize,
        /// Delivery node.
        delivery: usize,
    },
    /// The route ends with goods still on board.
    #[error("pickup {pickup} is never delivered")]
    OpenPickup {
        /// Pickup node.
        pickup: usize,
    },
}

/// A partially built route for one vehicle.
#[derive(Debug, Clone)]
pub struct RouteSchedule<'r> {
    request: &'r SolveRequest,
    matrix: &'r MatrixResult,
    pairs: &'r PickupDeliveryIndex,
    capacity: &'r Load,
    end: usize,
    shift_end: f64,
    nodes: Vec<usize>,
    departure: f64,
    load: Load,
    peak: Load,
    open_pickups: Vec<usize>,
    cost: f64,
}

/// The state a route would reach after one more visit.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    node: usize,
    departure: f64,
    load: Load,
    peak: Load,
    cost: f64,
}

impl Step {
    /// Objective cost of the arc into the node.
    #[must_use]
    pub const fn arc_cost(&self) -> f64 {
        self.cost
    }
}

impl<'r> RouteSchedule<'r> {
    /// Start an empty route at the vehicle's start node.
    #[must_use]
    pub fn new(
        request: &'r SolveRequest,
        matrix: &'r MatrixResult,
        pairs: &'r PickupDeliveryIndex,
        vehicle: &'r Vehicle,
    ) -> Self {
        let depot = request.depot_index;
        Self {
            request,
            matrix,
            pairs,
            capacity: &vehicle.capacity,
            end: vehicle.end_node(depot),
            shift_end: vehicle.shift_end(),
            nodes: vec![vehicle.start_node(depot)],
            departure: vehicle.shift_start(),
            load: Load::zero(),
            peak: Load::zero(),
            open_pickups: Vec::new(),
            cost: 0.0,
        }
    }

    /// Nodes visited so far, starting with the start anchor.
    #[must_use]
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// The most recently visited node.
    #[must_use]
    pub fn last(&self) -> usize {
        self.nodes.last().copied().unwrap_or(self.end)
    }

    /// Objective cost accumulated so far, excluding the return leg.
    #[must_use]
    pub const fn cost(&self) -> f64 {
        self.cost
    }

    /// Departure time from the last node.
    #[must_use]
    pub const fn departure(&self) -> f64 {
        self.departure
    }

    /// Pickups on board whose deliveries are still due.
    #[must_use]
    pub fn open_pickups(&self) -> &[usize] {
        &self.open_pickups
    }

    /// Whether the route serves no customer yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn arc(&self, from: usize, to: usize) -> Result<(f64, Option<f64>), RouteViolation> {
        let distance = self
            .matrix
            .distance(from, to)
            .ok_or(RouteViolation::UnknownNode { node: to })?;
        Ok((distance, self.matrix.duration(from, to)))
    }

    /// Evaluate visiting `node` next without changing the route.
    ///
    /// # Errors
    ///
    /// Returns the [`RouteViolation`] the visit would cause, including a
    /// vehicle that could no longer reach its end node in time.
    pub fn evaluate(&self, node: usize) -> Result<Step, RouteViolation> {
        if self.nodes.contains(&node) {
            return Err(RouteViolation::Revisit { node });
        }
        let (distance, duration) = self.arc(self.last(), node)?;
        let arrival = self.departure + duration.unwrap_or(0.0);
        let mut service_start = arrival;
        if let Some(window) = self.request.time_window(node) {
            if arrival > window.end() {
                return Err(RouteViolation::Late { node, arrival });
            }
            service_start = arrival.max(window.start());
        }
        let departure = service_start + self.request.service_time(node);

        let (load, peak) = match self.pairs.role(node) {
            PairRole::Single => {
                let demand = self.request.demand(node);
                (self.load.clone(), self.peak.plus(demand))
            }
            PairRole::Pickup { .. } => {
                let load = self.load.plus(self.pairs.load(node));
                let peak = component_max(&self.peak, &load);
                (load, peak)
            }
            PairRole::Delivery { pickup } => {
                if !self.open_pickups.contains(&pickup) {
                    return Err(RouteViolation::Precedence {
                        pickup,
                        delivery: node,
                    });
                }
                (self.load.minus(self.pairs.load(pickup)), self.peak.clone())
            }
        };
        if !peak.fits_within(self.capacity) {
            return Err(RouteViolation::Capacity { node });
        }

        let (_, back) = self.arc(node, self.end)?;
        if departure + back.unwrap_or(0.0) > self.shift_end {
            return Err(RouteViolation::Shift { end: self.end });
        }

        Ok(Step {
            node,
            departure,
            load,
            peak,
            cost: self.request.objective().arc_cost(distance, duration),
        })
    }

    /// Apply a step produced by [`RouteSchedule::evaluate`] on this route.
    pub fn apply(&mut self, step: Step) {
        match self.pairs.role(step.node) {
            PairRole::Pickup { .. } => self.open_pickups.push(step.node),
            PairRole::Delivery { pickup } => self.open_pickups.retain(|open| *open != pickup),
            PairRole::Single => {}
        }
        self.nodes.push(step.node);
        self.departure = step.departure;
        self.load = step.load;
        self.peak = step.peak;
        self.cost += step.cost;
    }

    /// Visit `node` next.
    ///
    /// # Errors
    ///
    /// Returns the [`RouteViolation`] and leaves the route unchanged when the
    /// visit is infeasible.
    pub fn push(&mut self, node: usize) -> Result<(), RouteViolation> {
        let step = self.evaluate(node)?;
        self.apply(step);
        Ok(())
    }

    /// Objective cost of the leg back to the end node.
    ///
    /// # Errors
    ///
    /// Returns [`RouteViolation::UnknownNode`] when the end node is not in the
    /// matrix.
    pub fn return_cost(&self) -> Result<f64, RouteViolation> {
        let (distance, duration) = self.arc(self.last(), self.end)?;
        Ok(self.request.objective().arc_cost(distance, duration))
    }

    /// Finish the route at the end node.
    ///
    /// # Errors
    ///
    /// Returns [`RouteViolation::OpenPickup`] while goods are still on board,
    /// or [`RouteViolation::Shift`] when the end node is reached too late.
    pub fn close(mut self) -> Result<Vec<usize>, RouteViolation> {
        if let Some(pickup) = self.open_pickups.first() {
            return Err(RouteViolation::OpenPickup { pickup: *pickup });
        }
        let (_, back) = self.arc(self.last(), self.end)?;
        if self.departure + back.unwrap_or(0.0) > self.shift_end {
            return Err(RouteViolation::Shift { end: self.end });
        }
        self.nodes.push(self.end);
        Ok(self.nodes)
    }
}

fn component_max(lhs: &Load, rhs: &Load) -> Load {
    let width = lhs.dimensions().max(rhs.dimensions());
    Load::new(
        (0..width)
            .map(|idx| lhs.component(idx).max(rhs.component(idx)))
            .collect(),
    )
}

/// Replay a complete route and report the first constraint it breaks.
///
/// # Errors
///
/// Returns a [`RouteViolation`] for wrong anchors, repeated nodes, overload,
/// late arrival, broken precedence or undelivered pickups.
pub fn check_route(
    request: &SolveRequest,
    matrix: &MatrixResult,
    vehicle: &Vehicle,
    nodes: &[usize],
) -> Result<(), RouteViolation> {
    let depot = request.depot_index;
    let (start, end) = (vehicle.start_node(depot), vehicle.end_node(depot));
    let anchors = RouteViolation::Anchors { start, end };
    let [first, visits @ .., last] = nodes else {
        return Err(anchors);
    };
    if (*first, *last) != (start, end) {
        return Err(anchors);
    }
    let pairs = request.pairs();
    let mut schedule = RouteSchedule::new(request, matrix, &pairs, vehicle);
    for node in visits {
        schedule.push(*node)?;
    }
    schedule.close().map(|_| ())
}

/// Keep the tours of a backend assignment that replay cleanly.
///
/// Tours for unknown vehicles or that break a constraint are dropped with a
/// warning naming `backend`. Returns the accepted tours and every customer
/// none of them serves, in index order.
#[must_use]
pub fn accept_routes(
    request: &SolveRequest,
    matrix: &MatrixResult,
    assignment: Vec<(String, Vec<usize>)>,
    backend: &str,
) -> (Vec<(String, Vec<usize>)>, Vec<usize>) {
    let accepted: Vec<(String, Vec<usize>)> = assignment
        .into_iter()
        .filter(|(vehicle_id, nodes)| {
            let Some(vehicle) = request.fleet.iter().find(|v| &v.id == vehicle_id) else {
                warn!("{backend} returned a tour for unknown vehicle `{vehicle_id}`");
                return false;
            };
            match check_route(request, matrix, vehicle, nodes) {
                Ok(()) => true,
                Err(violation) => {
                    warn!("discarding {backend} tour of `{vehicle_id}`: {violation}");
                    false
                }
            }
        })
        .collect();
    let served: BTreeSet<usize> = accepted
        .iter()
        .flat_map(|(_, nodes)| nodes.iter().copied())
        .collect();
    let unassigned = request
        .customer_nodes()
        .into_iter()
        .filter(|node| !served.contains(node))
        .collect();
    (accepted, unassigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scenario_matrix, single_vehicle, timed_matrix};
    use crate::{Fleet, TimeWindow};
    use rstest::rstest;

    fn request(capacity: u32) -> SolveRequest {
        SolveRequest::with_matrix("test", scenario_matrix(), single_vehicle(capacity))
            .with_demands(vec![Load::zero(), Load::scalar(3), Load::scalar(4)])
    }

    fn vehicle(request: &SolveRequest) -> &Vehicle {
        request.fleet.vehicles().first().expect("one vehicle")
    }

    #[rstest]
    fn rejected_tours_leave_customers_unassigned() {
        let request = request(5);
        let matrix = scenario_matrix();
        let tours = vec![
            ("van".to_owned(), vec![0, 1, 2, 0]),
            ("ghost".to_owned(), vec![0, 2, 0]),
        ];
        let (accepted, unassigned) = accept_routes(&request, &matrix, tours, "test");
        assert!(accepted.is_empty(), "overloaded and unknown tours are dropped");
        assert_eq!(unassigned, vec![1, 2]);
    }

    #[rstest]
    fn accepts_scenario_route() {
        let request = request(999);
        let matrix = scenario_matrix();
        assert_eq!(check_route(&request, &matrix, vehicle(&request), &[0, 1, 2, 0]), Ok(()));
    }

    #[rstest]
    fn single_demands_accumulate() {
        let request = request(6);
        let matrix = scenario_matrix();
        assert_eq!(
            check_route(&request, &matrix, vehicle(&request), &[0, 1, 2, 0]),
            Err(RouteViolation::Capacity { node: 2 })
        );
    }

    #[rstest]
    fn delivery_before_pickup_is_rejected() {
        let request = request(10).with_pairs(vec![(1, 2)]);
        let matrix = scenario_matrix();
        assert_eq!(
            check_route(&request, &matrix, vehicle(&request), &[0, 2, 1, 0]),
            Err(RouteViolation::Precedence { pickup: 1, delivery: 2 })
        );
        assert_eq!(check_route(&request, &matrix, vehicle(&request), &[0, 1, 2, 0]), Ok(()));
    }

    #[rstest]
    fn pair_load_is_released_at_delivery() {
        let request = request(4).with_pairs(vec![(1, 2)]);
        let matrix = scenario_matrix();
        assert_eq!(check_route(&request, &matrix, vehicle(&request), &[0, 1, 2, 0]), Ok(()));
    }

    #[rstest]
    fn close_with_goods_on_board_fails() {
        let request = request(10).with_pairs(vec![(1, 2)]);
        let matrix = scenario_matrix();
        let pairs = request.pairs();
        let mut schedule = RouteSchedule::new(&request, &matrix, &pairs, vehicle(&request));
        schedule.push(1).expect("pickup fits");
        assert_eq!(schedule.open_pickups(), &[1]);
        assert_eq!(schedule.close(), Err(RouteViolation::OpenPickup { pickup: 1 }));
    }

    #[rstest]
    fn waiting_for_window_then_serving() {
        let window = TimeWindow::new(20.0, 30.0).expect("valid window");
        let request = SolveRequest::with_matrix("test", timed_matrix(), single_vehicle(10))
            .with_time_windows(vec![None, Some(window), None])
            .with_service_times(vec![0.0, 5.0, 0.0]);
        let matrix = timed_matrix();
        let pairs = request.pairs();
        let mut schedule = RouteSchedule::new(&request, &matrix, &pairs, vehicle(&request));
        schedule.push(1).expect("window reachable");
        assert_eq!(schedule.departure(), 25.0);
    }

    #[rstest]
    fn late_arrival_is_rejected() {
        let window = TimeWindow::new(0.0, 2.0).expect("valid window");
        let request = SolveRequest::with_matrix("test", timed_matrix(), single_vehicle(10))
            .with_time_windows(vec![None, Some(window), None]);
        let matrix = timed_matrix();
        assert!(matches!(
            check_route(&request, &matrix, vehicle(&request), &[0, 1, 0]),
            Err(RouteViolation::Late { node: 1, .. })
        ));
    }

    #[rstest]
    fn shift_end_bounds_return() {
        let fleet = Fleet::new(vec![
            Vehicle::new("v", Load::scalar(10))
                .with_time_window(TimeWindow::new(0.0, 15.0).expect("valid window")),
        ])
        .expect("valid fleet");
        let request = SolveRequest::with_matrix("test", timed_matrix(), fleet);
        let matrix = timed_matrix();
        assert_eq!(
            check_route(&request, &matrix, vehicle(&request), &[0, 1, 0]),
            Err(RouteViolation::Shift { end: 0 })
        );
    }

    #[rstest]
    fn wrong_anchors_are_rejected() {
        let request = request(999);
        let matrix = scenario_matrix();
        assert_eq!(
            check_route(&request, &matrix, vehicle(&request), &[1, 2, 0]),
            Err(RouteViolation::Anchors { start: 0, end: 0 })
        );
    }
}
