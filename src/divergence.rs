use ndarray::{ArrayBase, Data, Ix2, NdFloat, Zip};

/// Half squared Frobenius distance: `0.5 * sum((x - y)^2)`.
pub fn euclidean<A, S1, S2>(x: &ArrayBase<S1, Ix2>, y: &ArrayBase<S2, Ix2>) -> A
where
    A: NdFloat,
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
{
    let mut acc = A::zero();
    Zip::from(x).and(y).for_each(|&xv, &yv| {
        let d = xv - yv;
        acc = acc + d * d;
    });
    acc / (A::one() + A::one())
}

/// Itakura-Saito divergence: `sum(x/y - log(x/y)) - count`.
///
/// Requires `y` strictly positive. A zero in `x` makes the log term NaN;
/// callers must keep both operands positive (the limiting value is not
/// substituted).
pub fn itakura_saito<A, S1, S2>(x: &ArrayBase<S1, Ix2>, y: &ArrayBase<S2, Ix2>) -> A
where
    A: NdFloat,
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
{
    let mut acc = A::zero();
    Zip::from(x).and(y).for_each(|&xv, &yv| {
        let ratio = xv / yv;
        acc = acc + ratio - ratio.ln();
    });
    acc - A::from(x.len()).unwrap()
}

/// Generalized (unnormalized) Kullback-Leibler divergence:
/// `sum(x * log(x/y) + y - x)`. Requires `x` and `y` strictly positive.
pub fn kullback_leibler<A, S1, S2>(x: &ArrayBase<S1, Ix2>, y: &ArrayBase<S2, Ix2>) -> A
where
    A: NdFloat,
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
{
    let mut acc = A::zero();
    Zip::from(x).and(y).for_each(|&xv, &yv| {
        acc = acc + xv * (xv / yv).ln() + yv - xv;
    });
    acc
}

/// Beta-divergence between two equal-shaped non-negative matrices.
///
/// Dispatches on exact equality of `beta`: 0 selects Itakura-Saito, 1
/// Kullback-Leibler, 2 the half Euclidean distance. Any other value uses the
/// generic closed form
/// `sum(x^b + (b-1)*y^b - b*x*y^(b-1)) / (b*(b-1))`,
/// which is singular at 0 and 1, so the special cases are separate formulas
/// rather than limits of the generic one.
///
/// Panics if the shapes differ. Non-positive entries are the caller's
/// problem: NaN/Inf propagate unchanged.
pub fn beta_divergence<A, S1, S2>(x: &ArrayBase<S1, Ix2>, y: &ArrayBase<S2, Ix2>, beta: A) -> A
where
    A: NdFloat,
    S1: Data<Elem = A>,
    S2: Data<Elem = A>,
{
    let one = A::one();
    let two = one + one;
    if beta == A::zero() {
        itakura_saito(x, y)
    } else if beta == one {
        kullback_leibler(x, y)
    } else if beta == two {
        euclidean(x, y)
    } else {
        let bm1 = beta - one;
        let mut acc = A::zero();
        Zip::from(x).and(y).for_each(|&xv, &yv| {
            acc = acc + xv.powf(beta) + bm1 * yv.powf(beta) - beta * xv * yv.powf(bm1);
        });
        acc / (beta * bm1)
    }
}
