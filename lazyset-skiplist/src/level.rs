use rand::Rng;

/// Geometric level sampling: climb one level per successful trial, capped at
/// `max_level`. Returns a value in `[0, max_level]`.
pub(crate) fn random_level<R>(rng: &mut R, max_level: usize, promotion_probability: f64) -> usize
where
    R: Rng + ?Sized,
{
    let mut level = 0;
    while level < max_level && rng.random_bool(promotion_probability) {
        level += 1;
    }
    level
}
