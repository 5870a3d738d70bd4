use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use basic_cleaning::{logging, ArtifactStore, LocalArtifactStore};

/// Generate a synthetic listings table and log it as the raw input artifact
#[derive(Parser)]
struct Args {
    /// Number of distinct listings before duplicates are injected
    #[arg(long, default_value_t = 500)]
    rows: usize,

    /// PRNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Artifact name to log the table under
    #[arg(long = "artifact_name", default_value = "sample.csv")]
    artifact_name: String,

    /// Artifact type
    #[arg(long = "artifact_type", default_value = "raw_data")]
    artifact_type: String,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

const HEADER: [&str; 11] = [
    "id",
    "name",
    "host_id",
    "neighbourhood_group",
    "room_type",
    "price",
    "minimum_nights",
    "number_of_reviews",
    "last_review",
    "longitude",
    "latitude",
];

fn listing(rng: &mut SimpleRng, id: usize) -> Vec<String> {
    let boroughs = ["Manhattan", "Brooklyn", "Queens", "Bronx", "Staten Island"];
    let room_types = ["Entire home/apt", "Private room", "Shared room"];
    let adjectives = ["Cozy", "Sunny", "Spacious", "Quiet", "Charming"];

    // Mostly inside the city, with a few stray coordinates.
    let (longitude, latitude) = if rng.chance(0.03) {
        (rng.range(-76.0, -72.0), rng.range(39.5, 42.0))
    } else {
        (rng.range(-74.2, -73.7), rng.range(40.55, 40.9))
    };

    // Mostly plausible prices with a long tail of outliers.
    let price = if rng.chance(0.05) {
        rng.range(1000.0, 10000.0).round() as i64
    } else {
        rng.range(10.0, 350.0).round() as i64
    };

    let reviews = (rng.next_u64() % 200) as i64;
    let last_review = if reviews == 0 {
        String::new()
    } else if rng.chance(0.02) {
        "not-a-date".to_string()
    } else {
        let year = 2015 + (rng.next_u64() % 5);
        let month = 1 + rng.next_u64() % 12;
        let day = 1 + rng.next_u64() % 28;
        format!("{year}-{month:02}-{day:02}")
    };

    vec![
        id.to_string(),
        format!("{} {}", rng.pick(&adjectives), rng.pick(&["loft", "studio", "apartment", "room"])),
        (1000 + rng.next_u64() % 5000).to_string(),
        rng.pick(&boroughs).to_string(),
        rng.pick(&room_types).to_string(),
        price.to_string(),
        (1 + rng.next_u64() % 30).to_string(),
        reviews.to_string(),
        last_review,
        format!("{longitude:.5}"),
        format!("{latitude:.5}"),
    ]
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let mut rows: Vec<Vec<String>> = (0..args.rows).map(|id| listing(&mut rng, id)).collect();

    // Re-insert a few exact copies further down the table.
    let copies: Vec<Vec<String>> = rows
        .iter()
        .filter(|_| rng.chance(0.04))
        .cloned()
        .collect();
    let duplicates = copies.len();
    rows.extend(copies);

    let dir: PathBuf = std::env::temp_dir().join(format!("generate_sample-{}", std::process::id()));
    std::fs::create_dir_all(&dir).context("creating scratch directory")?;
    let path = dir.join(&args.artifact_name);
    let mut writer = csv::Writer::from_path(&path).context("creating sample file")?;
    writer.write_record(HEADER).context("writing header")?;
    for row in &rows {
        writer.write_record(row).context("writing row")?;
    }
    writer.flush().context("flushing sample file")?;

    let mut store = LocalArtifactStore::from_env();
    let mut artifact = store.create_artifact(
        &args.artifact_name,
        &args.artifact_type,
        "Synthetic listings with duplicates and outliers",
    )?;
    store.attach_file(&mut artifact, &path)?;
    artifact.set_metadata("rows", rows.len());
    artifact.set_metadata("injected_duplicates", duplicates);
    let logged = store.register(artifact);
    let _ = std::fs::remove_dir_all(&dir);
    let logged = logged?;

    info!(
        "Logged {logged} ({} rows, {duplicates} duplicates) to {}",
        rows.len(),
        store.root().display()
    );
    println!("{logged}");
    Ok(())
}
