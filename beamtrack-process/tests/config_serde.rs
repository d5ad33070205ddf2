#![cfg(feature = "serde")]

use beamtrack_core::units::rigidity;
use beamtrack_core::{HollowElectronLens, KickModel, OperatingMode, RadialProfileVariant};
use beamtrack_process::{CollimationConfig, CollimationStages};

#[test]
fn test_collimation_config_from_json() {
    let config = CollimationConfig::default()
        .with_stages(CollimationStages::AT_ENTRANCE | CollimationStages::AT_EXIT)
        .with_loss_threshold(5.0)
        .with_loss_files("losses/");
    let json = serde_json::to_string(&config).unwrap();
    let back: CollimationConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
    assert!(back.stages.contains(CollimationStages::AT_EXIT));
    assert!(!back.stages.contains(CollimationStages::AT_CENTER));
}

#[test]
fn test_lens_with_ac_from_json() {
    let mut lens = HollowElectronLens::new(5.0, 0.195, 3.0, rigidity(7000.0))
        .with_radii(1.0e-3, 2.0e-3)
        .with_mode(OperatingMode::Resonant)
        .with_kick_model(KickModel::Radial(RadialProfileVariant::Lhc));
    lens.set_ac(0.31, 0.002, 1.0e-4, 10, 1.0);
    let json = serde_json::to_string(&lens).unwrap();
    let back: HollowElectronLens = serde_json::from_str(&json).unwrap();
    assert_eq!(back.mode, OperatingMode::Resonant);
    assert!(back.is_ac_configured());
    assert!((back.rmax - 2.0e-3).abs() < 1e-15);
}
