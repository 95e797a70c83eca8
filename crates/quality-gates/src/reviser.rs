//! Reviser
//!
//! Deterministic widening of arguments between attempts, applied only after
//! a goal-unmet verdict. Radius and limit never decrease: a value already
//! above the cap is kept as is.

use tokyo_map_tools::{ModeArgs, SearchArgs, TripArgs};

const RADIUS_FACTOR: f64 = 1.8;
const LIMIT_FACTOR: u32 = 2;

const SEARCH_RADIUS_CAP_KM: f64 = 15.0;
const SEARCH_RADIUS_DEFAULT_KM: f64 = 3.0;
const SEARCH_LIMIT_CAP: u32 = 500;
const SEARCH_LIMIT_DEFAULT: u32 = 300;

const TRIP_RADIUS_CAP_KM: f64 = 20.0;
const TRIP_RADIUS_DEFAULT_KM: f64 = 5.0;
const TRIP_LIMIT_CAP: u32 = 800;
const TRIP_LIMIT_DEFAULT: u32 = 500;
const TRIP_PER_DAY_FLOOR: u32 = 3;

/// Revisions from this attempt onward also drop the optional filters.
const RELAX_FILTERS_FROM: u32 = 2;

fn widen_radius(current: Option<f64>, cap: f64, default: f64) -> f64 {
    match current.filter(|r| *r > 0.0) {
        Some(r) => r.max((r * RADIUS_FACTOR).min(cap)),
        None => default,
    }
}

fn widen_limit(current: Option<u32>, cap: u32, default: u32) -> u32 {
    match current.filter(|l| *l > 0) {
        Some(l) => l.max(l.saturating_mul(LIMIT_FACTOR).min(cap)),
        None => default,
    }
}

/// `attempt` counts revisions already made in this chain plus one.
pub fn revise_search(args: &SearchArgs, attempt: u32) -> SearchArgs {
    let mut next = args.clone();
    next.radius_km = Some(widen_radius(
        args.radius_km,
        SEARCH_RADIUS_CAP_KM,
        SEARCH_RADIUS_DEFAULT_KM,
    ));
    next.limit = Some(widen_limit(args.limit, SEARCH_LIMIT_CAP, SEARCH_LIMIT_DEFAULT));
    if attempt >= RELAX_FILTERS_FROM {
        next.open_24h = false;
        next.wheelchair = false;
    }
    next
}

pub fn revise_trip(args: &TripArgs, attempt: u32) -> TripArgs {
    let mut next = args.clone();
    next.radius_km = Some(widen_radius(
        args.radius_km,
        TRIP_RADIUS_CAP_KM,
        TRIP_RADIUS_DEFAULT_KM,
    ));
    next.limit = Some(widen_limit(args.limit, TRIP_LIMIT_CAP, TRIP_LIMIT_DEFAULT));
    if attempt >= RELAX_FILTERS_FROM {
        next.open_24h = false;
        next.wheelchair = false;
        // floor(per_day * 0.8), never below 3
        next.per_day = args
            .per_day
            .map(|p| (p * 4 / 5).max(TRIP_PER_DAY_FLOOR));
    }
    next
}

pub fn revise(args: &ModeArgs, attempt: u32) -> ModeArgs {
    let revised = match args {
        ModeArgs::Search(a) => ModeArgs::Search(revise_search(a, attempt)),
        ModeArgs::Trip(a) => ModeArgs::Trip(revise_trip(a, attempt)),
    };
    tracing::info!(
        "[reviser] attempt={} mode={} args={}",
        attempt,
        revised.mode(),
        revised.to_value()
    );
    revised
}
