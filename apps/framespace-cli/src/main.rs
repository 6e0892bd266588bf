use bytemuck::{Pod, Zeroable};
use clap::{Parser, Subcommand, ValueEnum};
use framespace_device::{DeviceCall, RecordingDevice, RenderDevice};
use framespace_frame::FrameContext;
use framespace_quadstream::{QuadMesh, StreamStrategy, VertexAttr, VertexLayout};
use framespace_state::StateBlock;
use glam::{Mat4, Vec3};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "framespace-cli", about = "Demos for the framespace frame-state core")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Staged,
    Orphan,
    Ring,
}

impl From<StrategyArg> for StreamStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Staged => StreamStrategy::StagedCopy,
            StrategyArg::Orphan => StreamStrategy::MappedOrphan,
            StrategyArg::Ring => StreamStrategy::MappedRing,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate info for the workspace
    Info,
    /// Simulate frames of a particle producer streaming quads
    Frame {
        /// Number of frames to run
        #[arg(short, long, default_value = "3")]
        frames: u32,
        /// Particles emitted per frame
        #[arg(short, long, default_value = "500")]
        particles: u32,
        /// Streaming strategy for the quad mesh
        #[arg(short, long, value_enum, default_value = "ring")]
        strategy: StrategyArg,
    },
    /// Walk through scoped state changes against the recording device
    State,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "trace" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("framespace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", framespace_common::crate_info());
            println!("device: {}", framespace_device::crate_info());
            println!("state: {}", framespace_state::crate_info());
            println!("shader-data: {}", framespace_shader_data::crate_info());
            println!("quadstream: {}", framespace_quadstream::crate_info());
            println!("frame: {}", framespace_frame::crate_info());
        }
        Commands::Frame {
            frames,
            particles,
            strategy,
        } => run_frames(frames, particles, strategy.into())?,
        Commands::State => run_state_demo(),
    }

    Ok(())
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ParticleVertex {
    position: [f32; 3],
    colour: [f32; 4],
}

/// A minimal streaming producer: deterministic particles billboarded into
/// quads, written through request/commit loops.
struct ParticleDemo {
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
}

impl ParticleDemo {
    fn new(count: u32, seed: u64) -> Self {
        let mut state = seed;
        let mut rand = move || {
            state = splitmix64(state);
            // Map the top bits into [-1, 1).
            (state >> 40) as f32 / (1u64 << 23) as f32 - 1.0
        };
        let mut positions = Vec::with_capacity(count as usize);
        let mut velocities = Vec::with_capacity(count as usize);
        for _ in 0..count {
            positions.push(Vec3::new(rand() * 4.0, rand() * 4.0, 0.0));
            velocities.push(Vec3::new(rand(), rand() + 1.5, 0.0));
        }
        Self {
            positions,
            velocities,
        }
    }

    fn step(&mut self, dt: f32) {
        for (p, v) in self.positions.iter_mut().zip(&self.velocities) {
            *p += *v * dt;
        }
    }

    /// Stream every particle as one quad. Returns the number of draw calls
    /// this pass issued.
    fn emit(&self, device: &mut dyn RenderDevice, mesh: &mut QuadMesh, pulse: f32) -> u32 {
        let stride = mesh.stride();
        let half = 0.05;
        let colour = [1.0, 0.8, 0.4, 1.0 - pulse];
        let mut draws = 0;
        let mut next = 0usize;
        while next < self.positions.len() {
            let want = (self.positions.len() - next) as u32;
            let region = mesh.request(device, want);
            let produced = region.quads;
            for (quad, chunk) in region
                .bytes
                .chunks_exact_mut(4 * stride)
                .take(produced as usize)
                .enumerate()
            {
                let centre = self.positions[next + quad];
                let corners = [
                    centre + Vec3::new(-half, -half, 0.0),
                    centre + Vec3::new(half, -half, 0.0),
                    centre + Vec3::new(half, half, 0.0),
                    centre + Vec3::new(-half, half, 0.0),
                ];
                for (slot, corner) in chunk.chunks_exact_mut(stride).zip(corners) {
                    let vertex = ParticleVertex {
                        position: corner.to_array(),
                        colour,
                    };
                    slot.copy_from_slice(bytemuck::bytes_of(&vertex));
                }
            }
            mesh.commit(device, produced);
            if produced > 0 {
                draws += 1;
            }
            next += produced as usize;
        }
        draws
    }
}

fn run_frames(frames: u32, particles: u32, strategy: StreamStrategy) -> anyhow::Result<()> {
    println!("Simulating {frames} frames, {particles} particles, {strategy:?}");

    let mut device = RecordingDevice::new();
    let mut ctx = FrameContext::new();
    let layout = VertexLayout::new([
        VertexAttr::new("position", 12),
        VertexAttr::new("colour", 16),
    ]);
    let mut mesh = QuadMesh::new(&mut device, 256, &layout, strategy)?;
    let mut demo = ParticleDemo::new(particles, 42);

    let additive = StateBlock::from_value(&serde_json::json!({
        "blend": ["add", "sourceAlpha", "one"],
        "depthWrite": false,
        "cullMode": "none",
    }))?;

    for frame in 0..frames {
        ctx.begin_frame(&mut device, 1.0 / 60.0);
        ctx.set_view(1280.0, 720.0);
        ctx.set_camera(
            Mat4::look_at_rh(Vec3::new(0.0, 2.0, 10.0), Vec3::ZERO, Vec3::Y),
            Mat4::perspective_rh(1.0, 16.0 / 9.0, 0.1, 100.0),
        );

        demo.step(1.0 / 60.0);
        let pulse = ctx.pulse();
        let draws = ctx.scoped(&mut device, "particles", &additive, |_, device| {
            demo.emit(device, &mut mesh, pulse)
        });

        let calls = device.drain_calls().len();
        println!(
            "frame {frame}: time={:.3} pulse={:.3} draws={draws} device_calls={calls}",
            ctx.time(),
            ctx.pulse(),
        );
    }

    let stats = *mesh.stats();
    println!(
        "totals: draws={} quads={} bytes={} wraps={}",
        stats.draws, stats.quads, stats.bytes_written, stats.wraps
    );
    mesh.destroy(&mut device);
    Ok(())
}

fn run_state_demo() {
    use framespace_device::{CompareFunc, CullMode};
    use framespace_state::{StateChange, StateStack};

    let mut device = RecordingDevice::new();
    let mut stack = StateStack::new();
    stack.reset(&mut device);
    println!(
        "baseline: cull={:?} depth={:?} write={:?}",
        stack.cull_mode(),
        stack.depth_compare(),
        stack.depth_write()
    );

    stack.push_scope("demo");
    stack.apply(&mut device, StateChange::CullMode(CullMode::None));
    stack.apply(&mut device, StateChange::DepthCompare(CompareFunc::Always));
    stack.apply(&mut device, StateChange::CullMode(CullMode::Front));
    println!(
        "inside scope: cull={:?} depth={:?} (log entries: {})",
        stack.cull_mode(),
        stack.depth_compare(),
        stack.log_len()
    );

    device.drain_calls();
    stack.pop_scope(&mut device, "demo");
    println!(
        "after pop: cull={:?} depth={:?}",
        stack.cull_mode(),
        stack.depth_compare()
    );
    println!("restore calls:");
    for call in device.calls() {
        match call {
            DeviceCall::SetCullMode(m) => println!("  set_cull_mode({m:?})"),
            DeviceCall::SetDepthCompare(f) => println!("  set_depth_compare({f:?})"),
            other => println!("  {other:?}"),
        }
    }
}

/// Splitmix64 step: a fast deterministic PRNG for repeatable demos.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
