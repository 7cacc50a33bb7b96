//! Depth-first branch and bound over arc decisions.

use std::collections::BTreeSet;
use std::time::Instant;

use fleetroute_core::{
    MatrixResult, PickupDeliveryIndex, RouteSchedule, SolveRequest, Step, Vehicle,
};

use crate::AbortSignal;

/// Tolerance when comparing a bound with the incumbent.
const EPSILON: f64 = 1e-9;

/// Best complete assignment found so far.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Incumbent {
    pub objective: f64,
    pub routes: Vec<(String, Vec<usize>)>,
}

/// Why the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Every branch was explored or pruned.
    Exhausted,
    /// The deadline, node budget or abort signal cut the search short.
    Stopped,
}

/// Limits on one search.
pub(crate) struct Budget<'a> {
    /// `None` when the time limit reaches past what `Instant` can represent.
    pub deadline: Option<Instant>,
    pub node_limit: Option<u64>,
    pub abort: &'a AbortSignal,
}

/// Routes fixed so far, with their objective costs.
#[derive(Default)]
struct Closed {
    routes: Vec<(String, Vec<usize>, f64)>,
}

impl Closed {
    fn cost(&self) -> f64 {
        self.routes.iter().map(|(_, _, cost)| cost).sum()
    }

    fn longest(&self) -> f64 {
        self.routes
            .iter()
            .map(|(_, _, cost)| *cost)
            .fold(0.0, f64::max)
    }
}

pub(crate) struct Search<'r> {
    request: &'r SolveRequest,
    matrix: &'r MatrixResult,
    pairs: &'r PickupDeliveryIndex,
    vehicles: &'r [Vehicle],
    budget: Budget<'r>,
    balance: f64,
    min_in: Vec<f64>,
    remaining: BTreeSet<usize>,
    closed: Closed,
    best: Option<Incumbent>,
    explored: u64,
    stopped: bool,
}

impl<'r> Search<'r> {
    pub fn new(
        request: &'r SolveRequest,
        matrix: &'r MatrixResult,
        pairs: &'r PickupDeliveryIndex,
        budget: Budget<'r>,
    ) -> Self {
        let objective = request.objective();
        let nodes = request.node_count();
        let min_in = (0..nodes)
            .map(|to| {
                (0..nodes)
                    .filter(|from| *from != to)
                    .filter_map(|from| {
                        matrix
                            .distance(from, to)
                            .map(|metres| objective.arc_cost(metres, matrix.duration(from, to)))
                    })
                    .fold(f64::INFINITY, f64::min)
            })
            .map(|cost| if cost.is_finite() { cost } else { 0.0 })
            .collect();
        Self {
            request,
            matrix,
            pairs,
            vehicles: request.fleet.vehicles(),
            budget,
            balance: objective.balance,
            min_in,
            remaining: request.customer_nodes().into_iter().collect(),
            closed: Closed::default(),
            best: None,
            explored: 0,
            stopped: false,
        }
    }

    /// Run the search to completion or until the budget runs out.
    pub fn run(mut self) -> (Outcome, Option<Incumbent>, u64) {
        if let Some(first) = self.vehicles.first() {
            let schedule = RouteSchedule::new(self.request, self.matrix, self.pairs, first);
            self.explore(0, &schedule);
        }
        let outcome = if self.stopped {
            Outcome::Stopped
        } else {
            Outcome::Exhausted
        };
        (outcome, self.best, self.explored)
    }

    fn should_stop(&mut self) -> bool {
        if !self.stopped {
            let over_budget = self
                .budget
                .node_limit
                .is_some_and(|limit| self.explored >= limit);
            let expired = self
                .budget
                .deadline
                .is_some_and(|deadline| Instant::now() >= deadline);
            self.stopped = over_budget || self.budget.abort.is_aborted() || expired;
        }
        self.stopped
    }

    fn lower_bound(&self, open_cost: f64) -> f64 {
        let pending: f64 = self
            .remaining
            .iter()
            .map(|node| self.min_in.get(*node).copied().unwrap_or(0.0))
            .sum();
        let longest = self.closed.longest().max(open_cost);
        self.closed.cost() + open_cost + self.balance * longest + pending
    }

    fn beaten(&self, bound: f64) -> bool {
        self.best
            .as_ref()
            .is_some_and(|best| bound >= best.objective - EPSILON)
    }

    /// Branch on the next arc of `vehicles[vehicle]`.
    ///
    /// Children extend the route with each feasible unserved customer,
    /// cheapest arc first, then try closing the route and moving on to the
    /// next vehicle.
    fn explore(&mut self, vehicle: usize, schedule: &RouteSchedule<'r>) {
        if self.should_stop() {
            return;
        }
        self.explored += 1;
        if self.beaten(self.lower_bound(schedule.cost())) {
            return;
        }

        let mut steps: Vec<(usize, Step)> = self
            .remaining
            .iter()
            .filter_map(|node| schedule.evaluate(*node).ok().map(|step| (*node, step)))
            .collect();
        steps.sort_by(|(lhs_node, lhs), (rhs_node, rhs)| {
            lhs.arc_cost()
                .total_cmp(&rhs.arc_cost())
                .then(lhs_node.cmp(rhs_node))
        });
        for (node, step) in steps {
            let mut next = schedule.clone();
            next.apply(step);
            self.remaining.remove(&node);
            self.explore(vehicle, &next);
            self.remaining.insert(node);
            if self.stopped {
                return;
            }
        }

        self.close_route(vehicle, schedule);
    }

    fn close_route(&mut self, vehicle: usize, schedule: &RouteSchedule<'r>) {
        let has_next = vehicle + 1 < self.vehicles.len();
        if !has_next && !self.remaining.is_empty() {
            return;
        }
        let Some(current) = self.vehicles.get(vehicle) else {
            return;
        };
        let (nodes, cost) = if schedule.is_empty() {
            (Vec::new(), 0.0)
        } else {
            let Ok(back) = schedule.return_cost() else {
                return;
            };
            let Ok(nodes) = schedule.clone().close() else {
                return;
            };
            (nodes, schedule.cost() + back)
        };
        self.closed.routes.push((current.id.clone(), nodes, cost));

        if self.remaining.is_empty() {
            self.record();
        } else if let Some(next) = self.vehicles.get(vehicle + 1) {
            let fresh = RouteSchedule::new(self.request, self.matrix, self.pairs, next);
            self.explore(vehicle + 1, &fresh);
        }

        self.closed.routes.pop();
    }

    fn record(&mut self) {
        let objective = self.closed.cost() + self.balance * self.closed.longest();
        if self.beaten(objective) {
            return;
        }
        let routes = self
            .closed
            .routes
            .iter()
            .filter(|(_, nodes, _)| !nodes.is_empty())
            .map(|(id, nodes, _)| (id.clone(), nodes.clone()))
            .collect();
        self.best = Some(Incumbent { objective, routes });
    }
}
