//! Well-known causal systems, usable from tests and from the `--builtin`
//! CLI flag.

use crate::error::Result;
use crate::graph::CausalGraphicalModel;
use crate::types::GraphSpec;

pub const NAMES: &[&str] = &[
    "chain",
    "collider",
    "fork",
    "path_one",
    "sprinkler",
    "simple_confounded",
    "simple_confounded_potential_outcomes",
    "latent_confounded",
    "frontdoor",
];

/// Specification of a built-in model by name.
pub fn spec(name: &str) -> Option<GraphSpec> {
    let spec = match name {
        "chain" => GraphSpec::new(["x1", "x2", "x3"]).with_edges([("x1", "x2"), ("x2", "x3")]),
        "collider" => GraphSpec::new(["x1", "x2", "x3"]).with_edges([("x1", "x2"), ("x3", "x2")]),
        "fork" => GraphSpec::new(["x1", "x2", "x3"]).with_edges([("x2", "x1"), ("x2", "x3")]),
        "path_one" => GraphSpec::new(["x1", "x2", "x3", "x4", "x5"])
            .with_edges([("x1", "x2"), ("x2", "x3"), ("x3", "x4"), ("x4", "x5")]),
        "sprinkler" => GraphSpec::new(["season", "rain", "sprinkler", "wet", "slippery"]).with_edges([
            ("season", "rain"),
            ("season", "sprinkler"),
            ("rain", "wet"),
            ("sprinkler", "wet"),
            ("wet", "slippery"),
        ]),
        "simple_confounded" => {
            GraphSpec::new(["x", "y", "z"]).with_edges([("z", "x"), ("z", "y"), ("x", "y")])
        }
        "simple_confounded_potential_outcomes" => GraphSpec::new(["x", "y_0", "y_1", "y", "z"]).with_edges([
            ("z", "x"),
            ("z", "y_0"),
            ("z", "y_1"),
            ("y_0", "y"),
            ("y_1", "y"),
            ("x", "y"),
        ]),
        "latent_confounded" => GraphSpec::new(["x", "y"]).edge("x", "y").latent_edge("x", "y"),
        "frontdoor" => GraphSpec::new(["x", "z", "y"])
            .with_edges([("x", "z"), ("z", "y")])
            .latent_edge("x", "y"),
        _ => return None,
    };
    Some(spec)
}

/// Build a built-in model by name. `Ok(None)` for unknown names.
pub fn by_name(name: &str) -> Result<Option<CausalGraphicalModel>> {
    spec(name).map(|spec| CausalGraphicalModel::from_spec(&spec)).transpose()
}

fn build(name: &str) -> CausalGraphicalModel {
    match by_name(name) {
        Ok(Some(model)) => model,
        Ok(None) => unreachable!("'{}' is listed in the catalog", name),
        Err(err) => unreachable!("built-in model '{}' is invalid: {}", name, err),
    }
}

/// x1 -> x2 -> x3
pub fn chain() -> CausalGraphicalModel {
    build("chain")
}

/// x1 -> x2 <- x3
pub fn collider() -> CausalGraphicalModel {
    build("collider")
}

/// x1 <- x2 -> x3
pub fn fork() -> CausalGraphicalModel {
    build("fork")
}

pub fn path_one() -> CausalGraphicalModel {
    build("path_one")
}

pub fn sprinkler() -> CausalGraphicalModel {
    build("sprinkler")
}

/// z confounds the effect of x on y.
pub fn simple_confounded() -> CausalGraphicalModel {
    build("simple_confounded")
}

pub fn simple_confounded_potential_outcomes() -> CausalGraphicalModel {
    build("simple_confounded_potential_outcomes")
}

/// x -> y with an unobserved confounder between x and y.
pub fn latent_confounded() -> CausalGraphicalModel {
    build("latent_confounded")
}

/// x -> z -> y with an unobserved confounder between x and y.
pub fn frontdoor() -> CausalGraphicalModel {
    build("frontdoor")
}
