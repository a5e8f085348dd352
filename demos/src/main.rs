// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sketch, extrude, edit, and watch the ids hold.
//!
//! Builds `sketch -> extrude`, recomputes, edits the extrusion distance and
//! recomputes again, then resolves a pick taken on a side face before the
//! edit.
//!
//! Run:
//! - `cargo run -p understory_demos -- --sides 5 --edited-distance 4`
//! - `RUST_LOG=understory_recompute=debug,understory_naming=debug cargo run -p understory_demos`

use anyhow::{Context, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use understory_naming::{Category, EntityKind, FeatureId, ShapeId};
use understory_prism::{ExtrudeFeature, SketchFeature};
use understory_recompute::{Model, Report, Role};

#[derive(Parser)]
#[command(name = "extrude_chain")]
#[command(about = "Recompute a sketch/extrude chain and check id stability")]
struct Cli {
    /// Polygon side count.
    #[arg(long, default_value_t = 4)]
    sides: i64,

    /// Polygon circumradius.
    #[arg(long, default_value_t = 1.0)]
    radius: f64,

    /// Initial extrusion distance.
    #[arg(long, default_value_t = 1.0)]
    distance: f64,

    /// Distance after the edit.
    #[arg(long, default_value_t = 3.0)]
    edited_distance: f64,

    /// Split this side face in two on the edit.
    #[arg(long)]
    split_side: Option<i64>,

    /// Skip the extrusion, passing the profile through.
    #[arg(long)]
    skip: bool,
}

fn init_tracing() {
    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "understory_recompute=info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn summarize(label: &str, model: &Model, report: &Report) {
    println!(
        "{label}: computed {}, passthrough {}, failures {}, diagnostics {}",
        report.computed.len(),
        report.passthrough.len(),
        report.failures.len(),
        report.diagnostics.len(),
    );
    for failure in &report.failures {
        println!("  {} failed: {}", failure.feature, failure.message);
    }
    for id in model.feature_ids() {
        if let Ok(table) = model.table(id) {
            println!(
                "  {id} ({}): {} entities, {} faces",
                model.find_feature(id).map_or("?", |f| f.kind().name()),
                table.len(),
                table.ids_of_kind(EntityKind::Face).len(),
            );
        }
    }
}

fn side_face(
    model: &Model,
    sketch: FeatureId,
    extrude: FeatureId,
) -> anyhow::Result<Option<ShapeId>> {
    let edge = model.table(sketch)?.ids_of_kind(EntityKind::Edge).first().copied();
    let naming = model.graph().naming(extrude)?;
    Ok(edge.and_then(|edge| naming.lookup(Category::Generated, edge)))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut model = Model::new();
    let sketch = model.add_feature(SketchFeature::new(cli.sides, cli.radius));
    let extrude = model.add_feature(ExtrudeFeature::new(cli.distance));
    model
        .connect(sketch, extrude, Role::Target)
        .context("connecting sketch to extrude")?;
    model.set_skipped(extrude, cli.skip)?;

    let report = model.recompute();
    summarize("initial", &model, &report);
    if !report.is_success() {
        bail!("initial recompute failed");
    }
    let before = model.table(extrude)?.ids();
    let pick = side_face(&model, sketch, extrude)?.map(|face| model.capture_pick(extrude, face));

    model.set_parameter(extrude, "distance", cli.edited_distance)?;
    if let Some(side) = cli.split_side {
        model.set_parameter(extrude, "split_side", side)?;
    }
    let report = model.recompute();
    summarize("edited", &model, &report);
    for (feature, diagnostic) in &report.diagnostics {
        println!("  {feature}: {diagnostic:?}");
    }

    let after = model.table(extrude)?.ids();
    let kept = before.iter().filter(|id| after.binary_search(*id).is_ok()).count();
    println!("ids kept across the edit: {kept} of {}", before.len());

    if let Some(pick) = pick {
        for resolution in model.resolve_picks(&[extrude], &[pick]) {
            println!("side face pick: {resolution:?}");
        }
    }
    Ok(())
}
