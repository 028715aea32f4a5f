use std::sync::Arc;

use arrow::array::{Float64Builder, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ndarray::Array3;
use parquet::arrow::ArrowWriter;

use spectral_unmix::config::DEFAULT_SIGNATURES;
use spectral_unmix::data::block::BlockFile;
use spectral_unmix::SignatureTable;

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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Random fractions summing to one.
    fn fractions(&mut self, n: usize) -> Vec<f64> {
        let raw: Vec<f64> = (0..n).map(|_| -self.next_f64().max(1e-15).ln()).collect();
        let total: f64 = raw.iter().sum();
        raw.into_iter().map(|v| v / total).collect()
    }
}

fn write_signatures(table: &SignatureTable, path: &str) {
    let mut values = ListBuilder::new(Float64Builder::new());
    for e in table.endmembers() {
        values.values().append_slice(&e.values);
        values.append(true);
    }
    let names = StringArray::from(table.names().collect::<Vec<_>>());

    let schema = Arc::new(Schema::new(vec![
        Field::new("name", DataType::Utf8, false),
        Field::new("values", DataType::List(Arc::new(Field::new("item", DataType::Float64, true))), false),
    ]));
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(names), Arc::new(values.finish())])
        .expect("Failed to create RecordBatch");

    let file = std::fs::File::create(path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");
}

fn main() {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let table = SignatureTable::parse(DEFAULT_SIGNATURES).expect("default signatures are valid");
    let design = table.design_matrix();
    let (bands, endmembers) = design.shape();
    let (rows, cols) = (64, 48);
    let noise_level = 0.5;

    let mut block = Array3::<f32>::zeros((bands, rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let x = rng.fractions(endmembers);
            for k in 0..bands {
                let signal: f64 = (0..endmembers).map(|j| design[(k, j)] * x[j]).sum();
                block[[k, r, c]] = (signal + rng.gauss(0.0, noise_level)) as f32;
            }
        }
    }
    // One dropped-out pixel so the NaN path shows up in the output.
    block[[0, rows / 2, cols / 2]] = f32::NAN;

    let signatures_path = "sample_signatures.parquet";
    write_signatures(&table, signatures_path);

    let block_path = "sample_block.json";
    let json = serde_json::to_string(&BlockFile::from_array(&block)).expect("Failed to serialize block");
    std::fs::write(block_path, json).expect("Failed to write block");

    println!(
        "Wrote {endmembers} signatures ({bands} bands) to {signatures_path} and a {rows}x{cols} block to {block_path}"
    );
}
