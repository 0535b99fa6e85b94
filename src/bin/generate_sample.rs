use std::fmt::Write as _;
use std::path::PathBuf;

use oes_analyzer::data::loader::generate_scan_file_names;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Emission lines (centre nm, width nm, amplitude counts) of the plasma.
const LINES: [(f64, f64, f64); 5] = [
    (486.0, 0.6, 2500.0),
    (612.0, 0.8, 1200.0),
    (656.0, 0.5, 4000.0),
    (657.0, 0.9, 6000.0),
    (777.0, 0.7, 3000.0),
];

const BACKGROUND: f64 = 150.0;

/// One scan: `wavelength;intensity` lines on a fixed grid. `on` scales the
/// emission lines (0 = plasma off, 1 = on).
fn render_scan(wavelengths: &[f64], on: f64, drift: f64, rng: &mut SimpleRng) -> String {
    let mut text = String::from("Wavelength;Intensity\n");
    for &wl in wavelengths {
        let signal: f64 = LINES
            .iter()
            .map(|&(mu, sigma, amp)| gaussian(wl, mu, sigma, amp * on * drift))
            .sum();
        let intensity = BACKGROUND + signal + rng.gauss(0.0, 20.0);
        writeln!(text, "{wl:.1};{intensity:.2}").expect("writing to String");
    }
    text
}

fn main() {
    let mut args = std::env::args().skip(1);
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "sample_scans".to_string()));
    let folders: usize = args.next().and_then(|a| a.parse().ok()).unwrap_or(3);
    let scans: u32 = args.next().and_then(|a| a.parse().ok()).unwrap_or(120);

    let mut rng = SimpleRng::new(42);

    // 190.0 → 900.0 nm, step 0.5
    let wavelengths: Vec<f64> = (0..=1420).map(|i| 190.0 + i as f64 * 0.5).collect();

    for exp in 0..folders {
        let folder = out_dir.join(format!("exp{}", exp + 1));
        std::fs::create_dir_all(&folder).expect("Failed to create output folder");

        let base_name = format!("OES_run{}", exp + 1);
        // plasma on for the middle ~60% of the run, a little later per experiment
        let on_at = scans / 5 + exp as u32 * 2;
        let off_at = scans - scans / 5;
        let drift_per_scan = 0.0005 * (exp as f64 + 1.0);

        for (i, name) in generate_scan_file_names(&base_name, 1, scans).iter().enumerate() {
            let index = i as u32 + 1;
            let on = if (on_at..off_at).contains(&index) { 1.0 } else { 0.0 };
            let drift = 1.0 - drift_per_scan * index.saturating_sub(on_at) as f64;
            let text = render_scan(&wavelengths, on, drift, &mut rng);
            std::fs::write(folder.join(name), text).expect("Failed to write scan file");
        }

        println!(
            "Wrote {scans} scans to {} (plasma on {on_at}..{off_at})",
            folder.display()
        );
    }
}
