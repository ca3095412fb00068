use crate::compare_floats::{max_of_2, min_of_2};
use crate::core::ground::geometry::{ByRowContext, RowContext, RowGeometry};
use crate::core::solar_geometry::view_factor;
use std::f64::consts::PI;

/// A row gap stops the summation once it adds no more than this fraction of
/// the sky already accumulated in its direction.
const CONVERGENCE_FRACTION: f64 = 0.01;

/// Upper bound on the row gaps summed in one direction.
const MAX_ROW_GAPS: usize = 1000;

/// Fraction of isotropic sky visible from each ground segment, per row context.
pub type SkyViewFactors = ByRowContext<Vec<f64>>;

/// Which gaps between rows a ground point looks through.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Gaps further towards the front of the array (-x)
    Ahead,
    /// The gap directly above the point's own span
    Above,
    /// Gaps further towards the back of the array (+x)
    Behind,
}

impl Direction {
    fn step(self) -> i64 {
        match self {
            Direction::Ahead => -1,
            Direction::Above => 0,
            Direction::Behind => 1,
        }
    }
}

/// Elevation of a row edge seen from ground position `x`, measured from the
/// horizon behind the point.
fn edge_elevation((edge_x, edge_y): (f64, f64), x: f64) -> f64 {
    edge_y.atan2(edge_x - x)
}

/// Sky view factor contributed by each successive row gap in one direction,
/// nearest gap first.
///
/// The gap at `offset` lies between rows `front + offset` and `front + offset + 1`,
/// where `front` is the row on the front side of the context's span. A missing
/// row leaves the sky open down to the horizon on its side.
///
/// Arguments:
/// * `geometry` - row geometry
/// * `x` - segment midpoint, measured from the start of the span, 0 to pitch
/// * `context` - which rows exist around the span
/// * `direction` - which gaps to look through
pub fn gap_contributions(
    geometry: &RowGeometry,
    x: f64,
    context: RowContext,
    direction: Direction,
) -> Vec<f64> {
    let x = context.span_position(x, geometry.pitch());
    let front_row = context.span_front_row();
    let step = direction.step();

    let mut contributions = vec![];
    let mut sum = 0.;
    let mut offset = step;

    for _ in 0..MAX_ROW_GAPS {
        let ahead_row = front_row + offset;
        let behind_row = ahead_row + 1;

        // highest angle blocked by the row behind the gap
        let beta1 = if context.has_row(behind_row) {
            max_of_2(
                edge_elevation(geometry.lower_edge(behind_row), x),
                edge_elevation(geometry.upper_edge(behind_row), x),
            )
        } else {
            0.
        };
        // lowest angle blocked by the row ahead of the gap
        let beta2 = if context.has_row(ahead_row) {
            min_of_2(
                edge_elevation(geometry.lower_edge(ahead_row), x),
                edge_elevation(geometry.upper_edge(ahead_row), x),
            )
        } else {
            PI
        };

        let contribution = if beta2 > beta1 {
            view_factor(beta1, beta2)
        } else {
            0.
        };
        sum += contribution;
        contributions.push(contribution);

        offset += step;
        if offset == 0 || contribution <= CONVERGENCE_FRACTION * sum {
            break;
        }
    }

    contributions
}

/// Sky view factor seen from `x` through the gaps in one direction.
pub fn view_in_direction(
    geometry: &RowGeometry,
    x: f64,
    context: RowContext,
    direction: Direction,
) -> f64 {
    gap_contributions(geometry, x, context, direction)
        .iter()
        .sum()
}

/// Directional sky view sums at one segment midpoint. Only the sums that differ
/// between contexts are evaluated more than once: the view behind the first row
/// and the view ahead of the last row match the interior.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyViewBreakdown {
    pub interior_ahead: f64,
    pub interior_above: f64,
    pub interior_behind: f64,
    pub first_above: f64,
    pub last_above: f64,
}

impl SkyViewBreakdown {
    pub fn at(geometry: &RowGeometry, x: f64) -> Self {
        Self {
            interior_ahead: view_in_direction(geometry, x, RowContext::Interior, Direction::Ahead),
            interior_above: view_in_direction(geometry, x, RowContext::Interior, Direction::Above),
            interior_behind: view_in_direction(
                geometry,
                x,
                RowContext::Interior,
                Direction::Behind,
            ),
            // with no row ahead, everything in front of the first row is one gap
            first_above: view_in_direction(geometry, x, RowContext::First, Direction::Above),
            // with no row behind, everything behind the last row is one gap
            last_above: view_in_direction(geometry, x, RowContext::Last, Direction::Above),
        }
    }

    pub fn interior(&self) -> f64 {
        self.interior_ahead + self.interior_above + self.interior_behind
    }

    pub fn first(&self) -> f64 {
        self.first_above + self.interior_behind
    }

    pub fn last(&self) -> f64 {
        self.interior_ahead + self.last_above
    }

    pub fn for_context(&self, context: RowContext) -> f64 {
        match context {
            RowContext::Interior => self.interior(),
            RowContext::First => self.first(),
            RowContext::Last => self.last(),
        }
    }
}

/// Sky view factors at the midpoints of `segment_count` equal segments of the
/// row to row span, for interior, first and last rows.
pub fn sky_view_factors(geometry: &RowGeometry, segment_count: usize) -> SkyViewFactors {
    let breakdowns = (0..segment_count)
        .map(|segment| {
            SkyViewBreakdown::at(geometry, geometry.segment_midpoint(segment, segment_count))
        })
        .collect::<Vec<_>>();

    ByRowContext::from_fn(|context| {
        breakdowns
            .iter()
            .map(|breakdown| breakdown.for_context(context))
            .collect()
    })
}
