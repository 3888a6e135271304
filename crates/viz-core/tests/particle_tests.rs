// Host-side tests for the particle field, trails and connections.

use glam::Vec3;
use std::f32::consts::{PI, TAU};
use viz_core::bands::FrequencyBands;
use viz_core::constants::SIZE_ENERGY_BONUS;
use viz_core::particles::shapes::group_sizes;
use viz_core::particles::{
    ConnectionSettings, ConnectionSystem, DistributionShape, Group, ParticleField,
    ParticleMotion, ParticleSettings, TrailSettings, TrailSystem,
};
use viz_core::{AudioPipeline, BandExtractor};

fn settings(count: usize) -> ParticleSettings {
    ParticleSettings {
        count,
        ..ParticleSettings::default()
    }
}

#[test]
fn group_sizes_cover_count() {
    for count in [1000, 1001, 1002, 8000, 49_999, 50_000] {
        let s = group_sizes(count, [0.33, 0.34, 0.33]);
        assert_eq!(s.iter().sum::<usize>(), count);
        let expected = [0.33, 0.34, 0.33].map(|r| count as f32 * r);
        for (got, want) in s.iter().zip(expected) {
            assert!((*got as f32 - want).abs() <= 1.5, "{s:?} for {count}");
        }
    }
}

#[test]
fn count_is_clamped() {
    assert_eq!(ParticleField::new(settings(10)).len(), 1000);
    assert_eq!(ParticleField::new(settings(1_000_000)).len(), 50_000);
    let mut field = ParticleField::new(settings(2000));
    field.set_particle_count(3000);
    assert_eq!(field.len(), 3000);
    assert_eq!(field.positions().len(), 3000);
    assert_eq!(field.colors().len(), 3000);
}

#[test]
fn shape_change_keeps_count_and_partition() {
    let mut field = ParticleField::new(settings(4000));
    field.initialize(DistributionShape::Sphere, 1.0);
    let sphere_base = field.base_positions().to_vec();
    let sphere_counts = field.group_counts();

    field.initialize(DistributionShape::Dna, 1.0);
    assert_eq!(field.len(), sphere_base.len());
    assert_eq!(field.group_counts(), sphere_counts);
    assert_ne!(field.base_positions(), sphere_base.as_slice());

    let counted = Group::ALL.map(|g| field.groups().iter().filter(|&&x| x == g).count());
    assert_eq!(counted, sphere_counts);
}

#[test]
fn same_seed_reproduces_layout() {
    let a = ParticleField::new(settings(1500));
    let b = ParticleField::new(settings(1500));
    assert_eq!(a.base_positions(), b.base_positions());
}

#[test]
fn every_shape_produces_finite_positions() {
    for shape in DistributionShape::ALL {
        let mut field = ParticleField::new(ParticleSettings {
            shape,
            count: 1200,
            ..ParticleSettings::default()
        });
        let bands = FrequencyBands::new(0.8, 0.6, 0.9);
        for _ in 0..5 {
            field.update(&bands);
        }
        assert!(
            field.positions().iter().all(|p| p.is_finite()),
            "{} produced non-finite positions",
            shape.name()
        );
    }
}

#[test]
fn atom_mid_group_orbits_and_dna_overrides_all() {
    let atom = ParticleField::new(ParticleSettings {
        shape: DistributionShape::Atom,
        ..settings(1200)
    });
    for (m, g) in atom.motion().iter().zip(atom.groups()) {
        let orbit = matches!(m, ParticleMotion::Orbit { .. });
        assert_eq!(orbit, *g == Group::Mid);
    }

    let dna = ParticleField::new(ParticleSettings {
        shape: DistributionShape::Dna,
        ..settings(1200)
    });
    for (m, g) in dna.motion().iter().zip(dna.groups()) {
        match g {
            Group::Bass | Group::Mid => assert!(matches!(m, ParticleMotion::Strand { .. })),
            Group::High => assert!(matches!(m, ParticleMotion::Rung { .. })),
        }
    }
}

#[test]
fn silence_leaves_generic_shapes_at_rest() {
    let mut field = ParticleField::new(settings(1000));
    field.update(&FrequencyBands::ZERO);
    for i in 0..field.len() {
        let off = field.offset(i).unwrap_or(Vec3::ONE);
        assert!(off.length() < 1e-6);
    }
}

#[test]
fn colors_scale_with_band_and_clamp() {
    let mut field = ParticleField::new(settings(1000));
    field.update(&FrequencyBands::new(1.0, 0.0, 0.0));
    let base = field.settings().group_colors;
    for (c, g) in field.colors().iter().zip(field.groups()) {
        for k in 0..3 {
            assert!(c[k] <= 1.0);
            let factor = if *g == Group::Bass { 2.0 } else { 0.6 };
            assert!((c[k] - (base[g.index()][k] * factor).min(1.0)).abs() < 1e-5);
        }
    }
}

#[test]
fn reactive_size_grows_with_energy() {
    let mut field = ParticleField::new(settings(1000));
    field.update(&FrequencyBands::ZERO);
    let quiet = field.point_size();
    field.update(&FrequencyBands::new(1.0, 1.0, 1.0));
    assert!(field.point_size() > quiet);

    let base = field.settings().base_size;
    assert!((quiet - base).abs() < 1e-7);
    let bands = FrequencyBands::new(0.6, 0.3, 0.0);
    field.update(&bands);
    let expected = base * (1.0 + bands.energy() * SIZE_ENERGY_BONUS);
    assert!((field.point_size() - expected).abs() < 1e-6);

    let mut fixed = ParticleField::new(ParticleSettings {
        reactive_size: false,
        ..settings(1000)
    });
    fixed.update(&FrequencyBands::new(1.0, 1.0, 1.0));
    assert_eq!(fixed.point_size(), fixed.settings().base_size);
}

#[test]
fn bass_only_buffer_moves_only_the_bass_group() {
    let mut data = vec![0u8; 1024];
    data[..=10].iter_mut().for_each(|v| *v = 255);
    let mut pipeline = AudioPipeline::default();
    let bands = pipeline.analyze(Some(&data), None, 0.0).bands;
    assert!(bands.bass > 0.0 && bands.mid.abs() < 1e-6 && bands.high.abs() < 1e-6);

    let mut field = ParticleField::new(settings(3000));
    field.update(&bands);
    let mut sum = [0.0_f32; 3];
    let mut max = [0.0_f32; 3];
    for (i, g) in field.groups().iter().enumerate() {
        let base = field.base_positions()[i].normalize_or_zero();
        let radial = field.offset(i).map_or(0.0, |o| o.dot(base).abs());
        sum[g.index()] += radial;
        max[g.index()] = max[g.index()].max(radial);
    }
    let counts = field.group_counts();
    let bass_mean = sum[0] / counts[0] as f32;
    assert!(bass_mean > 0.0);
    assert!(bass_mean > max[1] && bass_mean > max[2]);
}

#[test]
fn band_extractor_feeds_field_consistently() {
    let mut ex = BandExtractor::default();
    let mut field = ParticleField::default();
    let data = vec![180u8; 1024];
    for _ in 0..10 {
        let bands = ex.extract(&data);
        field.update(&bands);
    }
    assert!(field.time() > 0.0);
    assert!(field.rotation() > 0.0);
}

#[test]
fn zero_connection_distance_never_draws() {
    let mut field = ParticleField::new(ParticleSettings {
        count: 5000,
        connections: ConnectionSettings {
            enabled: true,
            max_connections: 5000,
            distance: 0.0,
        },
        ..ParticleSettings::default()
    });
    for _ in 0..10 {
        field.update(&FrequencyBands::new(1.0, 1.0, 1.0));
        assert_eq!(field.connection_lines().len(), 0);
    }

    // Even fully coincident points stay unconnected.
    let mut conn = ConnectionSystem::new(100, 50);
    let pos = vec![Vec3::ZERO; 100];
    let col = vec![[1.0; 3]; 100];
    conn.update(&pos, &col, 0.0, 1.0);
    assert_eq!(conn.segment_count(), 0);
}

#[test]
fn connections_respect_capacity_and_alpha() {
    let mut conn = ConnectionSystem::new(1000, 20);
    let k = conn.sample().len();
    assert_eq!(k, 6);
    let pos: Vec<Vec3> = (0..1000).map(|i| Vec3::new(i as f32 * 1e-4, 0.0, 0.0)).collect();
    let col = vec![[0.5; 3]; 1000];
    conn.update(&pos, &col, 1.0, 0.0);
    assert_eq!(conn.segment_count(), k * (k - 1) / 2);
    assert!(conn.segment_count() <= conn.capacity());

    let big = ConnectionSystem::new(50_000, 100_000);
    assert_eq!(big.sample().len(), 300);
    for v in conn.lines() {
        assert!(v.color[3] > 0.0 && v.color[3] <= 1.0);
        assert_eq!(&v.color[..3], &[0.5; 3]);
    }
}

#[test]
fn trails_tick_every_other_frame_and_decay() {
    let mut trails = TrailSystem::new(1000, 10, 8);
    assert_eq!(trails.tracked().len(), 10);
    let col = vec![[1.0; 3]; 1000];
    let mut pos = vec![Vec3::ZERO; 1000];

    trails.update(&pos, &col);
    assert_eq!(trails.history(0).map(|h| h.len()), Some(0));
    trails.update(&pos, &col);
    assert_eq!(trails.history(0).map(|h| h.len()), Some(1));

    for step in 0..40 {
        pos.iter_mut().for_each(|p| p.x = step as f32);
        trails.update(&pos, &col);
    }
    let hist = trails.history(0).cloned().unwrap_or_default();
    assert!(hist.len() <= 8);
    assert_eq!(hist.front().map(|p| p.alpha), Some(1.0));
    assert!(hist.iter().all(|p| p.alpha >= 0.05));
    assert!(hist
        .iter()
        .zip(hist.iter().skip(1))
        .all(|(a, b)| a.alpha > b.alpha));
    assert!(trails.segment_count() > 0);
}

#[test]
fn stationary_trails_emit_no_segments() {
    let mut field = ParticleField::new(ParticleSettings {
        count: 1000,
        trails: TrailSettings {
            enabled: true,
            length: 10,
            tracked: 50,
        },
        ..ParticleSettings::default()
    });
    for _ in 0..10 {
        field.update(&FrequencyBands::ZERO);
    }
    assert_eq!(field.trail_lines().len(), 0);
    assert!(field.trails().is_some());
}

#[test]
fn settings_deserialize_with_defaults() {
    let s: ParticleSettings = serde_json::from_str(r#"{"count": 2000, "shape": "atom"}"#)
        .unwrap_or_default();
    assert_eq!(s.count, 2000);
    assert_eq!(s.shape, DistributionShape::Atom);
    assert_eq!(s.seed, ParticleSettings::default().seed);
    assert!("quantum".parse::<DistributionShape>().is_ok());
    assert!("cube".parse::<DistributionShape>().is_err());
}

#[test]
fn degenerate_layout_settings_are_clamped() {
    for expansion in [0.0, -1.0, f32::NAN, f32::INFINITY] {
        let field = ParticleField::new(ParticleSettings {
            shape: DistributionShape::Dna,
            expansion,
            dna_turns: -3.0,
            ..settings(1000)
        });
        assert!(field.settings().expansion >= 0.01);
        assert!(field.settings().expansion.is_finite());
        assert!(field.settings().dna_turns >= 0.1);
        assert!(field.base_positions().iter().all(|p| p.is_finite()));
    }

    let mut field = ParticleField::new(settings(1000));
    for shape in DistributionShape::ALL {
        field.update_settings(ParticleSettings {
            shape,
            expansion: -1.0,
            dna_turns: f32::NAN,
            ..settings(1000)
        });
        assert_eq!(field.settings().shape, shape);
        assert!(field.settings().expansion > 0.0);
        assert!(field.settings().dna_turns.is_finite());
        assert!(field.base_positions().iter().all(|p| p.is_finite()));
    }
}

#[test]
fn dna_strands_spin_in_opposite_directions() {
    let mut field = ParticleField::new(ParticleSettings {
        shape: DistributionShape::Dna,
        ..settings(1200)
    });
    for _ in 0..10 {
        field.update(&FrequencyBands::ZERO);
    }
    let azimuth = |p: Vec3| p.z.atan2(p.x);
    let mut turned = [0usize; 2];
    for i in 0..field.len() {
        let ParticleMotion::Strand { direction, .. } = field.motion()[i] else {
            continue;
        };
        let base = field.base_positions()[i];
        let now = field.positions()[i];
        let delta = (azimuth(now) - azimuth(base) + PI).rem_euclid(TAU) - PI;
        assert!(delta * direction > 0.0, "strand point turned the wrong way");
        let g = field.groups()[i];
        let expected = if g == Group::Bass { 1.0 } else { -1.0 };
        assert_eq!(direction, expected);
        turned[g.index()] += 1;
    }
    let counts = field.group_counts();
    assert_eq!(turned, [counts[0], counts[1]]);
}
