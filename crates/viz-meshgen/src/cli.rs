//! Command-line surfaces of the two binaries.

use crate::export::GlbBuilder;
use crate::parts::{base_color, generate_pose, GeneratedPart};
use crate::validate::{inspect, Limits, PoseReport};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use viz_core::overlay::{Layer, Pose};

fn parse_pose(s: &str) -> Result<Pose, String> {
    s.parse()
}

fn parse_layer(s: &str) -> Result<Layer, String> {
    s.parse()
}

#[derive(Parser, Debug)]
#[command(name = "meshgen")]
#[command(about = "Generate the anatomical overlay pose models", long_about = None)]
pub struct MeshgenArgs {
    /// Pose to generate: open or closed (both when omitted)
    #[arg(long, value_name = "POSE", value_parser = parse_pose)]
    pub pose: Option<Pose>,

    /// Only generate one part: body, veins, brain or heart
    #[arg(long, value_name = "PART", value_parser = parse_layer)]
    pub part: Option<Layer>,

    /// Directory the pose containers are written to
    #[arg(long, value_name = "DIR", default_value = "models")]
    pub output: PathBuf,

    /// Print per-part triangle counts against their budgets
    #[arg(long)]
    pub stats: bool,

    /// Seed for vessel growth and surface noise
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

#[derive(Parser, Debug)]
#[command(name = "validate-models")]
#[command(about = "Check pose model files for required meshes and triangle limits", long_about = None)]
pub struct ValidateArgs {
    /// Directory holding pose-open.glb and pose-closed.glb
    #[arg(value_name = "DIR", default_value = "models")]
    pub dir: PathBuf,

    /// Per-mesh triangle limit
    #[arg(long, value_name = "N", default_value_t = 50_000)]
    pub max_triangles: usize,

    /// Whole-file triangle limit
    #[arg(long, value_name = "N", default_value_t = 150_000)]
    pub max_total: usize,
}

/// Container bytes for the given parts.
pub fn encode_parts(parts: &[GeneratedPart]) -> Result<Vec<u8>> {
    let mut builder = GlbBuilder::new(concat!("viz-meshgen ", env!("CARGO_PKG_VERSION")));
    for part in parts {
        builder
            .add_mesh(part.layer.mesh_name(), &part.mesh, base_color(part.layer))
            .with_context(|| format!("invalid {} mesh", part.layer))?;
    }
    let (bytes, stats) = builder.finish()?;
    log::debug!("[meshgen] export {:?}", stats);
    Ok(bytes)
}

fn print_stats(pose: Pose, parts: &[GeneratedPart]) {
    println!("pose {pose}");
    println!("  {:<8} {:>9} {:>10} {:>8}  status", "part", "vertices", "triangles", "budget");
    for p in parts {
        let status = match (p.placeholder, p.within_budget()) {
            (true, _) => "placeholder",
            (false, true) => "ok",
            (false, false) => "over budget",
        };
        println!(
            "  {:<8} {:>9} {:>10} {:>8}  {} (detail {:.2})",
            p.layer.name(),
            p.mesh.vertex_count(),
            p.mesh.triangle_count(),
            p.budget(),
            status,
            p.detail
        );
    }
}

/// Generate and write the requested pose files. Returns the written paths.
pub fn run_meshgen(args: &MeshgenArgs) -> Result<Vec<PathBuf>> {
    let poses = args.pose.map_or(Pose::ALL.to_vec(), |p| vec![p]);
    let layers = args.part.map_or(Layer::ALL.to_vec(), |l| vec![l]);
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let mut written = Vec::with_capacity(poses.len());
    for pose in poses {
        let parts = generate_pose(pose, &layers, args.seed);
        for p in parts.iter().filter(|p| !p.within_budget()) {
            log::warn!(
                "[meshgen] {}/{} exceeds its budget: {} > {} triangles",
                pose,
                p.layer,
                p.mesh.triangle_count(),
                p.budget()
            );
        }
        let bytes = encode_parts(&parts)?;
        let path = args.output.join(pose.file_name());
        std::fs::write(&path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        log::info!("[meshgen] wrote {} ({} bytes)", path.display(), bytes.len());
        if args.stats {
            print_stats(pose, &parts);
        }
        written.push(path);
    }
    Ok(written)
}

fn print_report(report: &PoseReport, limits: &Limits) {
    println!("{} ({} triangles)", report.path.display(), report.total_triangles());
    for m in &report.meshes {
        println!("  {:<12} {:>9} vertices {:>9} triangles", m.name, m.vertices, m.triangles);
    }
    for layer in &report.missing {
        println!("  missing required mesh: {}", layer.mesh_name());
    }
    for w in report.warnings(limits) {
        println!("  warning: {w}");
    }
}

fn read_report(dir: &Path, pose: Pose) -> Result<PoseReport> {
    let path = dir.join(pose.file_name());
    let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    inspect(&bytes, pose, path.clone()).with_context(|| format!("parsing {}", path.display()))
}

/// Check both pose files. Returns `false` when a file cannot be read or a
/// required mesh is missing; limit violations only warn.
pub fn run_validate(args: &ValidateArgs) -> bool {
    let limits = Limits {
        max_triangles: args.max_triangles,
        max_total: args.max_total,
    };
    let mut ok = true;
    for pose in Pose::ALL {
        match read_report(&args.dir, pose) {
            Ok(report) => {
                print_report(&report, &limits);
                ok &= report.missing.is_empty();
            }
            Err(e) => {
                log::error!("{e:#}");
                ok = false;
            }
        }
    }
    ok
}
