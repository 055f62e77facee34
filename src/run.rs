//! Builds the scene, runs the step loop, and wires the output encoders.

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

use eddy_fluids::fluid_2d::GridFluid2D;
use eddy_fluids::grid::Grid2;
use eddy_fluids::mac_2d::MacGrid2D;
use eddy_fluids::Real;
use eddy_io::FieldSeriesEncoder;

use crate::config::{Config, SceneLayout};

pub struct RunReport {
    /// Output operations (series opens, snapshot writes, index writes) that
    /// failed. The run continues past them; the process exit code reflects
    /// whether any occurred.
    pub io_errors: usize,
}

/// One optional encoder per output field, matching the `write_*` flags.
struct OutputWriters {
    u: Option<FieldSeriesEncoder>,
    v: Option<FieldSeriesEncoder>,
    p: Option<FieldSeriesEncoder>,
    div: Option<FieldSeriesEncoder>,
    norm_velocity: Option<FieldSeriesEncoder>,
    smoke: Option<FieldSeriesEncoder>,
    io_errors: usize,
}

impl OutputWriters {
    /// Open an encoder per enabled field. A field whose series cannot be
    /// opened is reported and left disabled; the run still proceeds.
    fn create(config: &Config) -> Self {
        let mut io_errors = 0;
        let mut writer = |enabled: bool, name: &str| -> Option<FieldSeriesEncoder> {
            if !enabled {
                return None;
            }
            match FieldSeriesEncoder::create(&config.folder, name) {
                Ok(enc) => Some(enc),
                Err(e) => {
                    log::error!(
                        "cannot open {name} output series in '{}': {e}",
                        config.folder
                    );
                    io_errors += 1;
                    None
                }
            }
        };

        let u = writer(config.write_u, "u");
        let v = writer(config.write_v, "v");
        let p = writer(config.write_p, "p");
        let div = writer(config.write_div, "div");
        let norm_velocity = writer(config.write_norm_velocity, "norm_velocity");
        let smoke = writer(config.write_smoke, "smoke");

        OutputWriters {
            u,
            v,
            p,
            div,
            norm_velocity,
            smoke,
            io_errors,
        }
    }

    /// Emit every enabled field at the given simulation time.
    fn emit(&mut self, mac: &MacGrid2D, time: f64) {
        let errors = &mut self.io_errors;
        let mut write = |enc: &mut Option<FieldSeriesEncoder>, grid: &Grid2, name: &str| {
            if let Some(enc) = enc {
                if let Err(e) = enc.encode_frame(grid, time) {
                    log::error!("failed to write {name} snapshot at t = {time}: {e}");
                    *errors += 1;
                }
            }
        };

        write(&mut self.u, &mac.u, "u");
        write(&mut self.v, &mac.v, "v");
        write(&mut self.p, &mac.p, "p");
        write(&mut self.div, &mac.div, "div");
        write(&mut self.norm_velocity, &mac.speed, "norm_velocity");
        write(&mut self.smoke, &mac.smoke, "smoke");
    }

    /// Write all collection indexes. Encoders also finalise on drop, but
    /// doing it here lets failures count toward the exit code.
    fn finish(&mut self) {
        for enc in [
            &mut self.u,
            &mut self.v,
            &mut self.p,
            &mut self.div,
            &mut self.norm_velocity,
            &mut self.smoke,
        ]
        .into_iter()
        .flatten()
        {
            if let Err(e) = enc.finish() {
                log::error!("failed to finalise output index: {e}");
                self.io_errors += 1;
            }
        }
    }
}

pub fn run(config: &Config, scene: &SceneLayout) -> RunReport {
    let mut mac = MacGrid2D::new(
        config.nx,
        config.ny,
        config.density as Real,
        config.dt as Real,
        config.dx as Real,
        config.dy as Real,
    );
    scene.apply(&mut mac);

    let mut fluid = GridFluid2D::new(
        mac,
        config.solver.solver_kind(),
        config.solver.max_iterations,
        config.solver.tolerance,
    );
    let mut out = OutputWriters::create(config);

    log::info!(
        "grid {}x{} (dx={}, dy={}), dt={}, nt={}, density={}, solver={} (max {}, tol {:e}), output '{}', base name '{}'",
        config.nx,
        config.ny,
        config.dx,
        config.dy,
        config.dt,
        config.nt,
        config.density,
        config.solver.kind,
        config.solver.max_iterations,
        config.solver.tolerance,
        config.folder,
        config.filename,
    );

    // Initial diagnostics and the t = 0 snapshot.
    fluid.mac.update_divergence();
    fluid.mac.update_speed();
    out.emit(&fluid.mac, 0.0);

    let bar_template =
        "Running {spinner:.green} [{elapsed}] [{bar:50.white/white}] {pos}/{len} ({eta})";
    let style = ProgressStyle::with_template(bar_template)
        .unwrap()
        .progress_chars("=> ");
    let progress = ProgressBar::new(config.nt as u64).with_style(style);

    let start = Instant::now();
    let report_every = (config.nt / 10).max(1);

    for t in 1..=config.nt {
        if t % report_every == 0 {
            log::info!(
                "step {t} / {}: max |div| = {:.3e}",
                config.nt,
                fluid.mac.max_divergence()
            );
        }

        fluid.step();

        if t % config.sampling_rate == 0 {
            out.emit(&fluid.mac, t as f64 * config.dt);
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    out.finish();
    log::info!("completed {} steps in {:.2?}", config.nt, start.elapsed());

    RunReport {
        io_errors: out.io_errors,
    }
}
