//! Predict the phase for a sample request against a model artifact
//!
//! Usage: cargo run --example predict_sample [-- path/to/model.json]

use inner_weather::{LoadedModel, PhasePredictor};

fn main() {
    let path = std::env::args().nth(1).unwrap_or_else(|| {
        concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/phase_model.json").to_string()
    });

    let predictor = match LoadedModel::from_path(&path) {
        Ok(model) => PhasePredictor::with_model(model),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let json = r#"{
        "wearable_data": {
            "spo2": 97.0, "gsr_mean": 5.2, "gsr_phasic_std": 0.35,
            "ppg_rmssd": 45.0, "heart_rate": 66.0, "skin_temp": 33.0
        },
        "hormone_data": { "estrogen": 150.0, "progesterone": 4.25 },
        "day_in_cycle": 14
    }"#;

    match predictor.predict_json(json) {
        Ok(result) => println!("{result}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}
