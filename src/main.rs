// src/main.rs - Command-line front end: generate bioprinter G-code jobs
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;

use bioprint_gcode::gcode::ArcDirection;
use bioprint_gcode::patterns::{print_disc, print_square};
use bioprint_gcode::vessel::{self, Vessel};
use bioprint_gcode::wellplate::DepositionPlan;
use bioprint_gcode::{
    AxisTarget, Config, ExtrusionUnit, LineSink, MotionController, Summary, WriterSink, load_config,
};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Bioprinter G-code generator
#[derive(Parser, Debug)]
#[command(name = "bioprint-gcode", version, about = "Generate G-code for a syringe-pump bioprinter.")]
struct Cli {
    /// Path to a TOML config file (defaults are used otherwise)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write G-code to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the end-of-job summary as JSON
    #[arg(long)]
    summary_json: Option<PathBuf>,

    /// Skip the descriptive header block
    #[arg(long)]
    no_header: bool,

    /// Override the configured syringe
    #[arg(long)]
    syringe: Option<String>,

    /// Override the configured tip
    #[arg(long)]
    tip: Option<String>,

    /// Enable debug messages
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deposit a flow-rate series into a row of wells
    Wells {
        /// Volume per well (uL)
        #[arg(long, default_value_t = 25.0)]
        volume: f64,
        /// Centre-to-centre well spacing (mm)
        #[arg(long, default_value_t = 9.1)]
        pitch: f64,
        /// Z lift between wells (mm)
        #[arg(long, default_value_t = 15.0)]
        lift: f64,
        /// Wells per flow rate
        #[arg(long, default_value_t = 3)]
        replicates: usize,
        /// Flow rates in mL/min, comma separated
        #[arg(long, value_delimiter = ',', default_values_t = [1.0, 5.0, 10.0])]
        flow_rates: Vec<f64>,
        /// Travel feedrate (mm/min)
        #[arg(long, default_value_t = 1000.0)]
        travel_rate: f64,
        /// Retraction feedrate (mm/min)
        #[arg(long, default_value_t = 100.0)]
        retraction_rate: f64,
        /// Volume retracted at the end (uL)
        #[arg(long, default_value_t = 250.0)]
        retraction: f64,
    },
    /// Fill an annulus with concentric circles
    Disc {
        /// Outer radius (mm)
        outer: f64,
        /// Inner radius (mm)
        #[arg(long, default_value_t = 0.0)]
        inner: f64,
        /// Radial step between rings (mm)
        #[arg(long, default_value_t = 0.5)]
        step: f64,
        /// Disc thickness (mm)
        #[arg(long, default_value_t = 0.3)]
        thickness: f64,
        /// CW or CCW
        #[arg(long, default_value = "CW")]
        direction: ArcDirection,
    },
    /// Raster one square layer
    Square {
        /// Side length (mm)
        side: f64,
        /// Layer height (mm)
        #[arg(long, default_value_t = 0.3)]
        layer_height: f64,
        /// Line spacing (mm)
        #[arg(long, default_value_t = 0.2)]
        spacing: f64,
        /// Z lift before travelling to the corner (mm)
        #[arg(long, default_value_t = 0.0)]
        lift: f64,
    },
    /// Estimate material for a vessel printed on a pipette
    Vessel {
        /// Vessel length (mm)
        length: f64,
        /// Wall thickness (um)
        thickness: f64,
        /// Pipette used as mandrel
        #[arg(long, default_value = "VWR-1ml")]
        pipette: String,
    },
    /// Short smoke-test job: extrude, move while extruding, one square layer
    Demo,
}

#[derive(Serialize)]
struct SummaryFile<'a> {
    generated_at: DateTime<Utc>,
    job: &'a str,
    summary: Summary,
}

fn start_controller<W: Write>(
    config: &Config,
    sink: WriterSink<W>,
) -> Result<MotionController<WriterSink<W>>, BoxError> {
    MotionController::from_config(config, sink).map_err(|e| {
        tracing::error!("Failed to initialize motion controller: {}", e);
        Box::new(e) as BoxError
    })
}

fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path).map_err(|e| {
                tracing::error!("Failed to load config from '{}': {}", path.display(), e);
                Box::new(e) as BoxError
            })?
        }
        None => Config::default(),
    };
    if let Some(syringe) = &cli.syringe {
        config.machine.syringe = syringe.clone();
    }
    if let Some(tip) = &cli.tip {
        config.machine.tip = tip.clone();
    }
    if cli.no_header {
        config.machine.include_header = false;
    }

    let writer: Box<dyn Write> = match &cli.output {
        Some(path) => {
            tracing::info!("Writing G-code to {}", path.display());
            Box::new(File::create(path)?)
        }
        None => Box::new(io::stdout().lock()),
    };
    let mut sink = WriterSink::new(writer);
    let generated_at = Utc::now();
    sink.emit_line(&format!(
        ";Generated by bioprint-gcode {} on {}",
        env!("CARGO_PKG_VERSION"),
        generated_at.to_rfc3339()
    ))?;

    let (job, summary) = match cli.command {
        Commands::Vessel {
            length,
            thickness,
            pipette,
        } => {
            let vessel = Vessel::on_pipette(&config, &pipette, length, thickness)?;
            let d = config.machine.output_digits;
            for line in vessel::settings_report(&config, &pipette, d)? {
                sink.emit_line(&format!(";{}", line))?;
            }
            sink.emit_line(&format!(";Vessel volume: {:.d$} uL", vessel.volume_ul()))?;
            if cli.summary_json.is_some() {
                tracing::warn!("The vessel estimate has no job summary; --summary-json ignored");
            }
            return Ok(());
        }
        Commands::Wells {
            volume,
            pitch,
            lift,
            replicates,
            flow_rates,
            travel_rate,
            retraction_rate,
            retraction,
        } => {
            let mut controller = start_controller(&config, sink)?;
            let plan = DepositionPlan {
                well_volume_ul: volume,
                center_to_center_mm: pitch,
                z_lift_mm: lift,
                travel_rate,
                retraction_rate,
                replicates,
                flow_rates_ml_min: flow_rates,
                retraction_volume_ul: retraction,
            };
            let outcome = plan.run(&mut controller)?;
            tracing::info!(
                "Deposited {} wells over {} columns",
                outcome.wells,
                outcome.columns_advanced
            );
            ("wells", controller.summary())
        }
        Commands::Disc {
            outer,
            inner,
            step,
            thickness,
            direction,
        } => {
            let mut controller = start_controller(&config, sink)?;
            print_disc(&mut controller, outer, inner, step, thickness, direction)?;
            controller.summary_report()?;
            ("disc", controller.summary())
        }
        Commands::Square {
            side,
            layer_height,
            spacing,
            lift,
        } => {
            let mut controller = start_controller(&config, sink)?;
            print_square(&mut controller, side, layer_height, spacing, lift)?;
            controller.summary_report()?;
            ("square", controller.summary())
        }
        Commands::Demo => {
            let mut controller = start_controller(&config, sink)?;
            controller.linear_move(AxisTarget::new().e(5.0), ExtrusionUnit::Millimeters)?;
            controller.linear_move(
                AxisTarget::new().x(5.0).y(5.0).e(1.01),
                ExtrusionUnit::Microliters,
            )?;
            print_square(&mut controller, 50.1, 0.222, 0.2, 0.0)?;
            controller.summary_report()?;
            ("demo", controller.summary())
        }
    };

    tracing::info!(
        "Job '{}' done: {:.3} uL dispensed, {:.1} s",
        job,
        summary.extrusion_volume_ul,
        summary.print_time_s
    );

    if let Some(path) = &cli.summary_json {
        let file = SummaryFile {
            generated_at,
            job,
            summary,
        };
        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        tracing::info!("Summary written to {}", path.display());
    }

    Ok(())
}
