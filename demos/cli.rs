//! Command-line interface for peroxide_scan
//!
//! Analyzes a strip photo against a calibration scale and prints the
//! outcome as JSON on stdout. With `--store`, runs the full operator flow
//! and persists accepted results for later delivery.

use peroxide_scan::image_loader::load_frame;
use peroxide_scan::{
    AnalysisConfig, AnalysisError, AnalysisOutcome, CaptureInput, CenteredRegionProvider,
    CsvReferenceScaleProvider, FileRecordStore, FixedRegionProvider, FlowResult, OfflineSyncApi,
    OperatorCaptureRequest, ReferenceScaleProvider, Region, RegionProvider, StripAnalyzer,
    SyncEngine, WorkflowService,
};
use std::sync::Arc;
use std::path::{Path, PathBuf};
use std::{env, process};

struct Options {
    image_path: String,
    scale_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    region: Option<Region>,
    store_dir: Option<PathBuf>,
    capture: Option<CaptureInput>,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!("Use --help for usage information");
            process::exit(1);
        }
    };

    let result = if options.store_dir.is_some() {
        run_flow(&options)
    } else {
        run_analysis(&options)
    };

    if let Err(error) = result {
        eprintln!("Analysis failed: {}", error);
        eprintln!("Suggestion: {}", error.user_message());
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        image_path: String::new(),
        scale_path: None,
        config_path: None,
        region: None,
        store_dir: None,
        capture: None,
    };
    let mut image_path = None;

    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--scale" => options.scale_path = Some(PathBuf::from(next_value(args, &mut i)?)),
            "--config" => options.config_path = Some(PathBuf::from(next_value(args, &mut i)?)),
            "--store" => options.store_dir = Some(PathBuf::from(next_value(args, &mut i)?)),
            "--region" => {
                let v = parse_numbers(&next_value(args, &mut i)?, 4)?;
                let region = Region::new(v[0] as u32, v[1] as u32, v[2] as u32, v[3] as u32)
                    .map_err(|e| e.to_string())?;
                options.region = Some(region);
            }
            "--capture" => {
                let v = parse_numbers(&next_value(args, &mut i)?, 5)?;
                options.capture = Some(CaptureInput {
                    distance_cm: v[0],
                    angle_degrees: v[1],
                    luminance: v[2],
                    blur_score: v[3],
                    saturation_ratio: v[4],
                });
            }
            "--help" | "-h" => {
                print_help(&args[0]);
                process::exit(0);
            }
            _ if !arg.starts_with("--") => {
                if image_path.is_some() {
                    return Err("multiple image paths provided".to_string());
                }
                image_path = Some(arg.to_string());
            }
            _ => return Err(format!("unknown option: {}", arg)),
        }
        i += 1;
    }

    options.image_path = image_path.ok_or_else(|| "missing image path".to_string())?;
    if options.store_dir.is_some() && options.capture.is_none() {
        return Err("--store requires --capture with the device-reported conditions".to_string());
    }
    Ok(options)
}

fn next_value(args: &[String], i: &mut usize) -> Result<String, String> {
    let name = &args[*i];
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("{} expects a value", name))
}

fn parse_numbers(raw: &str, count: usize) -> Result<Vec<f64>, String> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{}': {}", v, e)))
        .collect::<Result<_, _>>()?;
    if values.len() != count {
        return Err(format!("expected {} comma-separated values, got '{}'", count, raw));
    }
    Ok(values)
}

fn print_help(program_name: &str) {
    eprintln!("Usage: {} [OPTIONS] <image_path>", program_name);
    eprintln!();
    eprintln!("Measure peroxide concentration from a test strip photo.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scale PATH          Reference swatches CSV");
    eprintln!("                        (default: data/calibration/reference-swatches.csv)");
    eprintln!("  --config PATH         Analysis configuration JSON");
    eprintln!("  --region X,Y,W,H      Pad region (default: centred half of the frame)");
    eprintln!("  --store DIR           Run the operator flow and persist the result in DIR");
    eprintln!("  --capture D,A,L,B,S   Distance cm, angle deg, luminance, blur, saturation");
    eprintln!("                        (required with --store)");
    eprintln!("  --help, -h            Show this help message");
    eprintln!();
    eprintln!("Set RUST_LOG=debug for pipeline logs.");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} strip.jpg", program_name);
    eprintln!("  {} --region 40,60,80,80 strip.png", program_name);
    eprintln!("  {} --store records/ --capture 16,2,120,0.1,0.12 strip.jpg", program_name);
}

fn load_config(options: &Options) -> Result<AnalysisConfig, AnalysisError> {
    match &options.config_path {
        Some(path) => AnalysisConfig::from_json_file(path),
        None => Ok(AnalysisConfig::default()),
    }
}

fn scale_provider(options: &Options) -> CsvReferenceScaleProvider {
    match &options.scale_path {
        Some(path) => CsvReferenceScaleProvider::new(path.clone()),
        None => CsvReferenceScaleProvider::default(),
    }
}

fn run_analysis(options: &Options) -> Result<(), AnalysisError> {
    let analyzer = StripAnalyzer::new(load_config(options)?);
    let frame = load_frame(Path::new(&options.image_path))?;
    let region = match options.region {
        Some(region) => region,
        None => CenteredRegionProvider::default().provide(&frame)?,
    };
    let patches = scale_provider(options).load()?;

    let outcome = analyzer.analyze(&frame, &region, &patches)?;
    print_json(&outcome)?;
    print_summary(&outcome);
    Ok(())
}

fn run_flow(options: &Options) -> Result<(), AnalysisError> {
    let (Some(store_dir), Some(capture)) = (&options.store_dir, &options.capture) else {
        return Err(AnalysisError::invalid_parameter("--store", "missing --capture"));
    };

    let store = Arc::new(FileRecordStore::open(store_dir)?);
    let sync = Arc::new(SyncEngine::new(store.clone(), Arc::new(OfflineSyncApi)));
    let mut service = WorkflowService::new(store, sync)
        .with_config(load_config(options)?)
        .with_reference_scale(scale_provider(options));
    if let Some(region) = options.region {
        service = service.with_region_provider(FixedRegionProvider::new(region));
    }

    let request = OperatorCaptureRequest {
        image_ref: options.image_path.clone(),
        capture_input: capture.clone(),
        captured_at: chrono::Utc::now(),
    };
    let result = service.run_operator_flow(&request)?;
    print_json(&result)?;

    match &result {
        FlowResult::Rejected(validation) => {
            for message in validation.operator_messages() {
                eprintln!("Capture refused: {}", message);
            }
        }
        FlowResult::AnalysisRejected {
            operator_message,
            reasons,
        } => {
            eprintln!("{}", operator_message);
            for reason in reasons {
                eprintln!("  - {}", reason);
            }
        }
        FlowResult::Completed(record) => {
            eprintln!(
                "Stored {}: {} ppm ({}), pending delivery",
                record.local_id, record.ppm, record.compliance_status
            );
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AnalysisError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| AnalysisError::ProcessingError {
        message: format!("cannot serialize result: {}", e),
    })?;
    println!("{}", json);
    Ok(())
}

fn print_summary(outcome: &AnalysisOutcome) {
    match (&outcome.estimate, &outcome.decision) {
        (Some(estimate), Some(decision)) => {
            eprintln!(
                "{:.0} ppm (interval {:.0}-{:.0}), confidence {:.2}",
                estimate.ppm_estimate, estimate.ppm_min, estimate.ppm_max, outcome.confidence.score
            );
            eprintln!("{}: {}", decision.analysis_result, decision.recommended_action);
        }
        _ => {
            eprintln!("Capture rejected:");
            for reason in &outcome.quality.reasons {
                eprintln!("  - {}", reason);
            }
        }
    }
}
