use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use imagefp::{FilterType, HashAlg, HashSize, HasherConfig, PerceptualHash};
use log::{error, info};

// Usage example
// cargo run --release --features cli --bin hash_image -- --alg perception --size 16 --distances a.jpg b.jpg

#[derive(Parser)]
#[command(
    name = "hash_image",
    version,
    about = "Prints perceptual hashes of images and the distances between them"
)]
struct Cli {
    /// Images to hash
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<String>,

    /// Hash algorithm: average, difference or perception (or a, d, p)
    #[arg(short, long, default_value = "difference")]
    alg: HashAlg,

    /// "fixed" for 64-bit hashes, or the side length of an extended hash
    #[arg(short, long, default_value = "fixed")]
    size: HashSize,

    /// Filter used when shrinking the image
    #[arg(short, long, value_enum, default_value_t = Filter::Triangle)]
    filter: Filter,

    /// Also print the Hamming distance between every pair of images
    #[arg(short, long)]
    distances: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum Filter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<Filter> for FilterType {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => FilterType::Nearest,
            Filter::Triangle => FilterType::Triangle,
            Filter::CatmullRom => FilterType::CatmullRom,
            Filter::Gaussian => FilterType::Gaussian,
            Filter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

fn main() -> ExitCode {
    if let Err(e) = handsome_logger::init() {
        eprintln!("Failed to initialize logger: {e}");
    }

    let args = Cli::parse();

    let hasher = HasherConfig::new()
        .hash_alg(args.alg)
        .hash_size(args.size)
        .resize_filter(args.filter.into())
        .to_hasher();

    let mut failed = false;
    let mut hashes: Vec<(String, PerceptualHash)> = Vec::with_capacity(args.images.len());

    for path in args.images {
        let img = match image::open(&path) {
            Ok(img) => img,
            Err(e) => {
                error!("Failed to open {path}: {e}");
                failed = true;
                continue;
            }
        };

        match hasher.hash_image(&img) {
            Ok(hash) => {
                println!("{path}\t{hash}");
                hashes.push((path, hash));
            }
            Err(e) => {
                error!("Failed to hash {path}: {e}");
                failed = true;
            }
        }
    }

    info!("Hashed {} images", hashes.len());

    if args.distances {
        for (idx, (left_path, left)) in hashes.iter().enumerate() {
            for (right_path, right) in &hashes[idx + 1..] {
                match left.dist(right) {
                    Ok(dist) => println!("{left_path}\t{right_path}\t{dist}"),
                    Err(e) => error!("{e}"),
                }
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
