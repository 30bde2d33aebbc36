use std::path::PathBuf;

use clap::Parser;
use quadmark::{ImageRGB8, QuadDetector, TimeProfileStatistics};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Enable debugging output (slow)
    #[arg(short, long)]
    debug: bool,
    /// Reduce output
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
    /// Repeat processing on input set this many times
    #[arg(short, long, default_value_t = 1)]
    iters: usize,
    /// Use this many CPU threads
    #[arg(short, long, default_value_t = 1)]
    threads: usize,
    /// Fix the RANSAC random seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,
    /// Path to write debug images to
    #[arg(long)]
    debug_path: Option<PathBuf>,
    input_files: Vec<PathBuf>,
}

fn build_detector(args: &Args) -> QuadDetector {
    let mut builder = QuadDetector::builder().with_threads(args.threads);
    if let Some(seed) = args.seed {
        builder = builder.with_seed(seed);
    }
    builder.config.debug = args.debug;
    builder.config.debug_path = args.debug_path.clone();

    builder.build().expect("Error building detector")
}

fn load_image(path: &PathBuf) -> ImageRGB8 {
    let img = image::open(path)
        .unwrap_or_else(|e| panic!("Unable to read {} ({e})", path.display()))
        .to_rgb8();

    ImageRGB8::from_rgb_bytes(img.width() as usize, img.height() as usize, img.as_raw())
}

fn main() {
    let args = Args::parse();

    if args.input_files.is_empty() {
        panic!("No input files. Usage: detect [options] <image>...");
    }

    let detector = build_detector(&args);
    let mut stats = TimeProfileStatistics::default();

    for _ in 0..args.iters {
        for path in args.input_files.iter() {
            let im = load_image(path);

            let detections = detector
                .detect(&im)
                .unwrap_or_else(|e| panic!("Detection failed on {} ({e})", path.display()));

            stats.add(&detections.tp);

            if args.quiet {
                println!("{}: {} quadrangles", path.display(), detections.nquads);
                continue;
            }

            println!("{}: {} quadrangles", path.display(), detections.nquads);
            for (i, quad) in detections.quads.iter().enumerate() {
                let [p1, p2, p3, p4] = quad.corners();
                println!(
                    "  {:2}: ({}, {}) ({}, {}) ({}, {}) ({}, {})",
                    i, p1.x, p1.y, p2.x, p2.y, p3.x, p3.y, p4.x, p4.y
                );
            }
            println!("{}", detections.tp);
        }
    }

    if args.iters > 1 {
        println!("{stats}");
    }
}
