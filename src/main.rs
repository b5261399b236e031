//! special-image CLI
//!
//! Demonstration CLI that loads an image, runs it through one filter stage
//! as a special image, and writes the result.

use anyhow::{bail, Context, Result};
use special_image::prelude::*;
use std::path::Path;
use std::sync::Arc;

fn main() -> Result<()> {
    let mut args: Vec<String> = std::env::args().collect();
    let config = take_config(&mut args)?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    if args.len() < 2 {
        print_usage(&args[0]);
        return Ok(());
    }

    match args[1].as_str() {
        "info" => {
            if args.len() < 3 {
                bail!("Please specify an image path");
            }
            image_info(&args[2], &config)
        }
        "crop" | "tile" | "blur" | "offset" => {
            if args.len() < 4 {
                print_usage(&args[0]);
                bail!("Please specify input and output paths");
            }
            let stage = parse_stage(&args[1], &args[4..])?;
            process_image(&args[2], &args[3], stage, &config)
        }
        "help" | "--help" | "-h" => {
            print_usage(&args[0]);
            Ok(())
        }
        other => {
            print_usage(&args[0]);
            bail!("Unknown command: {}", other)
        }
    }
}

fn print_usage(program: &str) {
    println!("special-image v{}", special_image::VERSION);
    println!();
    println!("Usage: {} [--config <file>] <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  info <image>                          Show special image details");
    println!("  crop <in> <out> <x> <y> <w> <h>       Crop without copying");
    println!("  tile <in> <out> <mode> <w> <h>        Tile with clamp|repeat|mirror|decal");
    println!("  blur <in> <out> <sigma>               Gaussian blur");
    println!("  offset <in> <out> <dx> <dy>           Shift content within its bounds");
    println!("  help                                  Show this help message");
}

/// Remove `--config <file>` from `args` and load it.
fn take_config(args: &mut Vec<String>) -> Result<Config> {
    let Some(i) = args.iter().position(|a| a == "--config") else {
        return Ok(Config::default());
    };
    if i + 1 >= args.len() {
        bail!("--config requires a file path");
    }
    let path = args.remove(i + 1);
    args.remove(i);
    Config::from_path(&path).with_context(|| format!("Failed to load config {}", path))
}

fn parse_stage(command: &str, params: &[String]) -> Result<Box<dyn FilterStage>> {
    let expect = |n: usize| -> Result<()> {
        if params.len() < n {
            bail!("'{}' needs {} parameters, got {}", command, n, params.len());
        }
        Ok(())
    };

    Ok(match command {
        "crop" => {
            expect(4)?;
            let v = parse_all::<i32>(&params[..4])?;
            Box::new(CropStage::new(IRect::from_xywh(v[0], v[1], v[2], v[3])))
        }
        "tile" => {
            expect(3)?;
            let mode: TileMode = params[0].parse().map_err(anyhow::Error::msg)?;
            let v = parse_all::<i32>(&params[1..3])?;
            Box::new(TileStage::new(mode, ISize::new(v[0], v[1])))
        }
        "blur" => {
            expect(1)?;
            Box::new(BlurStage::new(parse_all::<f32>(&params[..1])?[0]))
        }
        "offset" => {
            expect(2)?;
            let v = parse_all::<f32>(&params[..2])?;
            Box::new(OffsetStage::new(v[0], v[1]))
        }
        other => bail!("Unknown stage: {}", other),
    })
}

fn parse_all<T: std::str::FromStr>(values: &[String]) -> Result<Vec<T>> {
    values
        .iter()
        .map(|v| v.parse::<T>().map_err(|_| anyhow::anyhow!("Invalid number: {}", v)))
        .collect()
}

fn load(path: &str, config: &Config) -> Result<SpecialImageRef> {
    let decoded = image::open(path).with_context(|| format!("Failed to open {}", path))?;
    let image = Image::from_dynamic(&decoded)?;
    Ok(make_from_raster_image(&image.bounds(), &image, &config.surface)?)
}

fn image_info(path: &str, config: &Config) -> Result<()> {
    let special = load(path, config)?;
    println!("Image: {}", path);
    println!("  Unique ID:  {}", special.unique_id());
    println!("  Dimensions: {}x{}", special.width(), special.height());
    println!("  Subset:     {}", special.subset());
    println!("  Color type: {:?}", special.color_type());
    println!("  Alpha type: {:?}", special.alpha_type());
    println!("  Backing:    {:?} ({} bytes)", special.backing_kind(), special.size());
    Ok(())
}

fn process_image(
    input: &str,
    output: &str,
    stage: Box<dyn FilterStage>,
    config: &Config,
) -> Result<()> {
    let special = load(input, config)?;

    let cache = Arc::new(SpecialImageCache::from_config(&config.cache));
    let mut pipeline = FilterPipeline::new().with_cache(cache);
    pipeline.push(stage);

    println!("Processing {} -> {}", input, output);
    let ctx = FilterContext::from_config(config);
    let result = pipeline.run(&ctx, special)?;

    let pixels = as_bitmap(result.output.as_ref())?;
    pixels
        .to_unpremul_rgba8()
        .save(Path::new(output))
        .with_context(|| format!("Failed to write {}", output))?;

    println!(
        "Complete in {:?} ({}x{})",
        result.stats.total_duration,
        result.output.width(),
        result.output.height()
    );
    Ok(())
}
