use std::time::Instant;

use ndarray::{s, Array2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use skyangle::Conversion;
use sunpsf::{
    airy, extended::ExtendedSourceError, source::SourceError, telescope::TelescopeError,
    Asterism, Builder, ExtendedSource, FromBuilder, Opd, Psf, PsfError, Source, SourceSet,
    Telescope,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn diffraction_limited_psf() {
    init_logger();
    let mut tel = Telescope::builder()
        .resolution(128)
        .diameter(8.)
        .build()
        .unwrap();
    let mut src: SourceSet = Source::builder().wavelength(500e-9).build().unwrap().into();
    src.through(&mut tel).unwrap();
    let now = Instant::now();
    let psf = tel.compute_psf(&mut src, 4., Some(511)).unwrap();
    println!("PSF in {:?}", now.elapsed());
    let psf = &psf.results()[0];
    assert_eq!(psf.resolution(), 511);

    let flux_per_pixel = 1e10 * 1e-3 * tel.pixel_size().powi(2);
    let peak = airy::discrete_peak(tel.pupil().pixel_area(), 512, flux_per_pixel);
    let center = psf.irradiance[[255, 255]];
    assert!(
        (center - peak).abs() < 1e-3 * peak,
        "peak: {center} (expected {peak})"
    );
    assert!(psf.irradiance.iter().all(|&x| x <= center));

    let reference = airy::pattern(511, 0.25, peak);
    let err = (&psf.irradiance.slice(s![251..260, 251..260])
        - &reference.slice(s![251..260, 251..260]))
        .iter()
        .fold(0f64, |m, x| m.max(x.abs()));
    assert!(err < 3e-2 * peak, "Airy core error: {err} (peak: {peak})");

    let profile = psf.irradiance.slice(s![255, 256..266]);
    let (first_min, _) = profile
        .iter()
        .enumerate()
        .find(|(k, x)| **x < profile[k + 1])
        .unwrap();
    let dark_ring_px = (first_min + 1) as f64;
    let pixel_scale = (500e-9f64 / 8. / 4.).to_arcsec();
    let expected = airy::first_dark_ring(500e-9, 8.).unwrap().to_arcsec() / pixel_scale;
    assert!(
        (dark_ring_px - expected).abs() <= 1.,
        "dark ring at {dark_ring_px}px (expected {expected}px)"
    );
}

#[test]
fn normalized_psfs_have_unit_sum() {
    init_logger();
    let mut tel = Telescope::builder()
        .resolution(48)
        .central_obstruction(0.3)
        .spiders(vec![0., 90., 180., 270.], 0.2)
        .build()
        .unwrap();
    let sources = [(0., 0.), (0.05, 45.), (0.1, 200.)]
        .into_iter()
        .map(|(r, a)| Source::builder().coordinates(r, a).build().unwrap())
        .collect();
    let mut src: SourceSet = Asterism::new(sources).unwrap().into();
    src.through(&mut tel).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let opd: Vec<Array2<f64>> = (0..3)
        .map(|_| Array2::from_shape_fn((48, 48), |_| rng.gen_range(-50e-9..50e-9)))
        .collect();
    tel.set_opd(opd).unwrap();
    let psf = tel.compute_psf(&mut src, 3., None).unwrap();
    assert_eq!(psf.len(), 3);
    for result in psf.results() {
        assert_eq!(result.resolution(), 144);
        assert!((result.normalized.sum() - 1.).abs() < 1e-9);
    }
    assert!(src.sources().iter().all(|src| src.phase_var() > 0.));
}

#[test]
fn coronagraph_reduces_the_energy() {
    init_logger();
    let mut tel = Telescope::builder().resolution(64).build().unwrap();
    let mut src: SourceSet = Source::builder().build().unwrap().into();
    src.through(&mut tel).unwrap();
    let psf = tel.compute_psf(&mut src, 4., None).unwrap();
    tel.set_coronagraph(Some(4.));
    let coro = tel.compute_psf(&mut src, 4., None).unwrap();
    let energy = |psf: &Psf| psf.results()[0].flux();
    assert!(energy(&coro) < energy(&psf));
}

#[test]
fn too_many_sub_directions() {
    let result = ExtendedSource::builder()
        .image(Array2::ones((2000, 2000)))
        .n_sub_dirs(8)
        .build();
    assert!(matches!(
        result,
        Err(PsfError::ExtendedSource(
            ExtendedSourceError::TooManySubDirections(8)
        ))
    ));
}

#[test]
fn mixed_wavelengths() {
    let sources = vec![
        Source::builder().wavelength(500e-9).build().unwrap(),
        Source::builder().wavelength(700e-9).build().unwrap(),
    ];
    let err = Asterism::new(sources).unwrap_err();
    assert!(matches!(
        err,
        PsfError::Source(SourceError::MixedWavelengths(..))
    ));
    assert!(err.is_configuration());
}

#[test]
fn opd_list_mismatch() {
    let mut tel = Telescope::builder().resolution(16).build().unwrap();
    let sources = vec![Source::builder().build().unwrap(); 2];
    let mut src: SourceSet = Asterism::new(sources).unwrap().into();
    src.through(&mut tel).unwrap();
    tel.set_opd(Opd::Maps(vec![Array2::zeros((16, 16)); 3]))
        .unwrap();
    assert!(matches!(
        tel.compute_psf(&mut src, 2., None),
        Err(PsfError::Telescope(TelescopeError::OpdLengthMismatch(3, 2)))
    ));
}

#[test]
fn uniform_sun() {
    init_logger();
    let mut tel = Telescope::builder()
        .resolution(32)
        .diameter(1.)
        .fov(60.)
        .build()
        .unwrap();
    let sun = ExtendedSource::builder()
        .image(Array2::ones((100, 100)))
        .plate_scale(0.25)
        .n_sub_dirs(3)
        .build()
        .unwrap();
    let zero_padding = sun.zero_padding_for(&tel);
    let mut src = SourceSet::from(sun);
    src.through(&mut tel).unwrap();
    assert_eq!(tel.opd().len(), 9);
    let now = Instant::now();
    let psf = tel.compute_psf(&mut src, zero_padding, None).unwrap();
    println!("Sun PSF in {:?}", now.elapsed());
    let Psf::Extended {
        tiles,
        composite,
        extent_arcsec,
    } = psf
    else {
        panic!("expected the PSF of an extended source")
    };
    assert_eq!(tiles.len(), 9);
    assert_eq!(extent_arcsec, [-5., 5.]);
    assert_eq!(composite.dim(), (40, 40));
    let peak = sunpsf::extended::blending::tent(30).fold(0f64, |m, x| m.max(*x));
    let center = composite[[20, 20]];
    assert!((center - peak).abs() < 1e-6 * peak, "{center} vs {peak}");
}
