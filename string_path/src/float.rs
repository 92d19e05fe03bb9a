pub trait Float: 'static + Sync + Send + num_traits::Float {
    const HALF: Self;
    const TWO: Self;
    const PI: Self;
}

impl Float for f32 {
    const HALF: Self = 0.5;
    const TWO: Self = 2.0;
    const PI: Self = core::f32::consts::PI;
}

impl Float for f64 {
    const HALF: Self = 0.5;
    const TWO: Self = 2.0;
    const PI: Self = core::f64::consts::PI;
}
