use itertools::{izip, Itertools};
use metfor::{Knots, Quantity, WindSpdDir, WindUV};
use optional::{some, Optioned};
use std::ops::Sub;

/// Interpolate values given two parallel slices of data and a target value.
///
/// Assumes that `xs` is strictly increasing. Targets outside the range of `xs` take the value at
/// the nearest end. Returns none if the slices are empty or the target can't be compared, e.g.
/// it is NaN.
#[inline]
pub fn linear_interpolate<X, Y>(xs: &[X], ys: &[Y], target_x: X) -> Optioned<Y>
where
    X: Quantity + PartialOrd + Sub<X>,
    <X as Sub<X>>::Output: Quantity,
    Y: Quantity + optional::Noned + Sub<Y>,
    <Y as Sub<Y>>::Output: Quantity,
{
    debug_assert_eq!(xs.len(), ys.len());

    enum BracketType<X, Y> {
        Bracket((X, Y), (X, Y)),
        EndEqual((X, Y)),
    }

    let (first, last) = match (xs.first(), xs.last(), ys.first(), ys.last()) {
        (Some(&x0), Some(&xn), Some(&y0), Some(&yn)) => ((x0, y0), (xn, yn)),
        _ => return Optioned::default(),
    };

    // Clamp to the ends
    if target_x <= first.0 {
        return some(first.1);
    } else if target_x >= last.0 {
        return some(last.1);
    }

    let make_bracket = |pnt_0: (X, Y), pnt_1: (X, Y)| -> Option<BracketType<X, Y>> {
        let (x0, _) = pnt_0;
        let (x1, _) = pnt_1;

        if x0 < target_x && x1 > target_x {
            Some(BracketType::Bracket(pnt_0, pnt_1))
        } else if x0 == target_x {
            Some(BracketType::EndEqual(pnt_0))
        } else if x1 == target_x {
            Some(BracketType::EndEqual(pnt_1))
        } else {
            None
        }
    };

    let value_opt = izip!(xs, ys)
        .map(|(&x, &y)| (x, y))
        // Look at them in pairs.
        .tuple_windows::<(_, _)>()
        // Find the pair that brackets the target value
        .find_map(|(pnt_0, pnt_1)| make_bracket(pnt_0, pnt_1))
        .map(|val| match val {
            BracketType::Bracket((x0, y0), (x1, y1)) => linear_interp(target_x, x0, x1, y0, y1),
            BracketType::EndEqual(pnt) => pnt.1,
        });

    Optioned::from(value_opt)
}

/// Interpolate a wind profile given as speed and direction.
///
/// The interpolation is done on the u and v components, with the same end clamping as
/// [`linear_interpolate`]. Levels with a missing wind are skipped.
pub fn linear_interpolate_wind<X>(
    xs: &[X],
    winds: &[Optioned<WindSpdDir<Knots>>],
    target_x: X,
) -> Optioned<WindSpdDir<Knots>>
where
    X: Quantity + PartialOrd + Sub<X>,
    <X as Sub<X>>::Output: Quantity,
{
    debug_assert_eq!(xs.len(), winds.len());

    let (xs, us, vs): (Vec<X>, Vec<Knots>, Vec<Knots>) = izip!(xs, winds)
        .filter_map(|(&x, w)| w.map(|w| (x, WindUV::<Knots>::from(w))))
        .fold(
            (vec![], vec![], vec![]),
            |(mut xs, mut us, mut vs), (x, WindUV { u, v })| {
                xs.push(x);
                us.push(u);
                vs.push(v);
                (xs, us, vs)
            },
        );

    let u = linear_interpolate(&xs, &us, target_x);
    let v = linear_interpolate(&xs, &vs, target_x);

    match (u.into_option(), v.into_option()) {
        (Some(u), Some(v)) => some(WindSpdDir::from(WindUV { u, v })),
        _ => Optioned::default(),
    }
}

#[inline]
pub(crate) fn linear_interp<X, Y>(x_val: X, x1: X, x2: X, y1: Y, y2: Y) -> Y
where
    X: Sub<X> + Copy + std::fmt::Debug + std::cmp::PartialEq,
    <X as Sub<X>>::Output: Quantity,
    Y: Quantity + Sub<Y>,
    <Y as Sub<Y>>::Output: Quantity,
{
    debug_assert_ne!(x1, x2);

    let run = (x2 - x1).unpack();
    let rise = (y2 - y1).unpack();
    let dx = (x_val - x1).unpack();

    Y::pack(y1.unpack() + dx * (rise / run))
}
