//! Color definition, channel, operation and blending functions.

use super::{arg, color, dim, dimension, number, wrong_type, BuiltinFn, FunctionError};
use crate::ast::Value;
use crate::types::Color;
use std::collections::HashMap;

type Result = std::result::Result<Value, FunctionError>;

pub(crate) fn register(table: &mut HashMap<&'static str, BuiltinFn>) {
    table.insert("rgb", rgb);
    table.insert("rgba", rgba);
    table.insert("argb", argb);
    table.insert("hsl", hsl);
    table.insert("hsla", hsla);
    table.insert("hsv", hsv);
    table.insert("hsva", hsva);

    table.insert("hue", hue);
    table.insert("saturation", saturation);
    table.insert("lightness", lightness);
    table.insert("hsvhue", hsvhue);
    table.insert("hsvsaturation", hsvsaturation);
    table.insert("hsvvalue", hsvvalue);
    table.insert("red", red);
    table.insert("green", green);
    table.insert("blue", blue);
    table.insert("alpha", alpha);
    table.insert("luma", luma);
    table.insert("luminance", luminance);

    table.insert("saturate", saturate);
    table.insert("desaturate", desaturate);
    table.insert("lighten", lighten);
    table.insert("darken", darken);
    table.insert("fadein", fadein);
    table.insert("fadeout", fadeout);
    table.insert("fade", fade);
    table.insert("spin", spin);
    table.insert("mix", mix);
    table.insert("tint", tint);
    table.insert("shade", shade);
    table.insert("greyscale", greyscale);
    table.insert("contrast", contrast);

    table.insert("multiply", |a| blend(a, |cb, cs| cb * cs));
    table.insert("screen", |a| blend(a, screen_mode));
    table.insert("overlay", |a| blend(a, overlay_mode));
    table.insert("softlight", |a| blend(a, softlight_mode));
    table.insert("hardlight", |a| blend(a, |cb, cs| overlay_mode(cs, cb)));
    table.insert("difference", |a| blend(a, |cb, cs| (cb - cs).abs()));
    table.insert("exclusion", |a| blend(a, |cb, cs| cb + cs - 2.0 * cb * cs));
    table.insert("average", |a| blend(a, |cb, cs| (cb + cs) / 2.0));
    table.insert("negation", |a| blend(a, |cb, cs| 1.0 - (cb + cs - 1.0).abs()));
}

/// A channel argument: percentages scale to `size`.
fn scaled(value: &Value, size: f64) -> std::result::Result<f64, FunctionError> {
    let d = dimension(value)?;
    Ok(if d.unit.is("%") { d.value * size / 100.0 } else { d.value })
}

fn amount(args: &[Value], index: usize) -> std::result::Result<f64, FunctionError> {
    Ok(dimension(arg(args, index)?)?.value / 100.0)
}

fn relative(args: &[Value]) -> bool {
    matches!(args.get(2), Some(Value::Keyword(k)) if k == "relative")
}

fn rgb(args: &[Value]) -> Result {
    match args {
        [r, g, b] => rgba(&[r.clone(), g.clone(), b.clone(), dim(1.0, "")]),
        [c] if matches!(c, Value::Color(_)) => Ok(c.clone()),
        _ => Err(FunctionError::Unsupported),
    }
}

fn rgba(args: &[Value]) -> Result {
    match args {
        [Value::Color(c), a] => Ok(Value::Color(c.with_alpha(number(a)?))),
        [c @ Value::Color(_)] => Ok(c.clone()),
        [r, g, b, a] => Ok(Value::Color(Color::rgba(
            scaled(r, 255.0)?,
            scaled(g, 255.0)?,
            scaled(b, 255.0)?,
            number(a)?,
        ))),
        _ => Err(FunctionError::Unsupported),
    }
}

fn argb(args: &[Value]) -> Result {
    Ok(Value::Anonymous(color(arg(args, 0)?)?.to_argb()))
}

fn hsl(args: &[Value]) -> Result {
    match args {
        [h, s, l] => hsla(&[h.clone(), s.clone(), l.clone(), dim(1.0, "")]),
        _ => Err(FunctionError::Unsupported),
    }
}

fn hsla(args: &[Value]) -> Result {
    match args {
        [h, s, l, a] => Ok(Value::Color(Color::from_hsl(
            dimension(h)?.value,
            number(s)?.clamp(0.0, 1.0),
            number(l)?.clamp(0.0, 1.0),
            number(a)?.clamp(0.0, 1.0),
        ))),
        _ => Err(FunctionError::Unsupported),
    }
}

fn hsv(args: &[Value]) -> Result {
    match args {
        [h, s, v] => hsva(&[h.clone(), s.clone(), v.clone(), dim(1.0, "")]),
        _ => Err(FunctionError::Unsupported),
    }
}

fn hsva(args: &[Value]) -> Result {
    match args {
        [h, s, v, a] => Ok(Value::Color(Color::from_hsv(
            dimension(h)?.value,
            number(s)?.clamp(0.0, 1.0),
            number(v)?.clamp(0.0, 1.0),
            number(a)?.clamp(0.0, 1.0),
        ))),
        _ => Err(FunctionError::Unsupported),
    }
}

fn hue(args: &[Value]) -> Result {
    Ok(dim(color(arg(args, 0)?)?.to_hsl().0, ""))
}

fn saturation(args: &[Value]) -> Result {
    Ok(dim(color(arg(args, 0)?)?.to_hsl().1 * 100.0, "%"))
}

fn lightness(args: &[Value]) -> Result {
    Ok(dim(color(arg(args, 0)?)?.to_hsl().2 * 100.0, "%"))
}

fn hsvhue(args: &[Value]) -> Result {
    Ok(dim(color(arg(args, 0)?)?.to_hsv().0, ""))
}

fn hsvsaturation(args: &[Value]) -> Result {
    Ok(dim(color(arg(args, 0)?)?.to_hsv().1 * 100.0, "%"))
}

fn hsvvalue(args: &[Value]) -> Result {
    Ok(dim(color(arg(args, 0)?)?.to_hsv().2 * 100.0, "%"))
}

fn red(args: &[Value]) -> Result {
    Ok(dim(color(arg(args, 0)?)?.r, ""))
}

fn green(args: &[Value]) -> Result {
    Ok(dim(color(arg(args, 0)?)?.g, ""))
}

fn blue(args: &[Value]) -> Result {
    Ok(dim(color(arg(args, 0)?)?.b, ""))
}

fn alpha(args: &[Value]) -> Result {
    Ok(dim(color(arg(args, 0)?)?.alpha, ""))
}

fn luma(args: &[Value]) -> Result {
    let c = color(arg(args, 0)?)?;
    Ok(dim(c.luma() * c.alpha * 100.0, "%"))
}

fn luminance(args: &[Value]) -> Result {
    let c = color(arg(args, 0)?)?;
    Ok(dim(c.luminance() * c.alpha * 100.0, "%"))
}

/// Applies `f` to the HSL form of the first argument.
fn adjust_hsl(args: &[Value], f: impl FnOnce(&mut (f64, f64, f64), f64, bool)) -> Result {
    let c = color(arg(args, 0)?)?;
    let amount = amount(args, 1)?;
    let mut hsl = c.to_hsl();
    f(&mut hsl, amount, relative(args));
    Ok(Value::Color(Color::from_hsl(hsl.0, hsl.1, hsl.2, c.alpha)))
}

fn step(current: f64, amount: f64, relative: bool) -> f64 {
    let delta = if relative { current * amount } else { amount };
    (current + delta).clamp(0.0, 1.0)
}

fn saturate(args: &[Value]) -> Result {
    adjust_hsl(args, |hsl, amount, rel| hsl.1 = step(hsl.1, amount, rel))
}

fn desaturate(args: &[Value]) -> Result {
    adjust_hsl(args, |hsl, amount, rel| hsl.1 = step(hsl.1, -amount, rel))
}

fn lighten(args: &[Value]) -> Result {
    adjust_hsl(args, |hsl, amount, rel| hsl.2 = step(hsl.2, amount, rel))
}

fn darken(args: &[Value]) -> Result {
    adjust_hsl(args, |hsl, amount, rel| hsl.2 = step(hsl.2, -amount, rel))
}

fn fadein(args: &[Value]) -> Result {
    let c = color(arg(args, 0)?)?;
    let alpha = step(c.alpha, amount(args, 1)?, relative(args));
    Ok(Value::Color(c.with_alpha(alpha)))
}

fn fadeout(args: &[Value]) -> Result {
    let c = color(arg(args, 0)?)?;
    let alpha = step(c.alpha, -amount(args, 1)?, relative(args));
    Ok(Value::Color(c.with_alpha(alpha)))
}

fn fade(args: &[Value]) -> Result {
    let c = color(arg(args, 0)?)?;
    Ok(Value::Color(c.with_alpha(amount(args, 1)?.clamp(0.0, 1.0))))
}

fn spin(args: &[Value]) -> Result {
    let c = color(arg(args, 0)?)?;
    let angle = dimension(arg(args, 1)?)?.value;
    let (h, s, l) = c.to_hsl();
    let hue = (h + angle) % 360.0;
    let hue = if hue < 0.0 { hue + 360.0 } else { hue };
    Ok(Value::Color(Color::from_hsl(hue, s, l, c.alpha)))
}

fn mix_colors(first: &Color, second: &Color, weight: f64) -> Color {
    let w = weight * 2.0 - 1.0;
    let a = first.alpha - second.alpha;
    let w1 = (if w * a == -1.0 { w } else { (w + a) / (1.0 + w * a) } + 1.0) / 2.0;
    let w2 = 1.0 - w1;
    Color::rgba(
        first.r * w1 + second.r * w2,
        first.g * w1 + second.g * w2,
        first.b * w1 + second.b * w2,
        first.alpha * weight + second.alpha * (1.0 - weight),
    )
}

fn mix(args: &[Value]) -> Result {
    let first = color(arg(args, 0)?)?;
    let second = color(arg(args, 1)?)?;
    let weight = match args.get(2) {
        Some(w) => dimension(w)?.value / 100.0,
        None => 0.5,
    };
    Ok(Value::Color(mix_colors(first, second, weight)))
}

fn weight_or_half(args: &[Value]) -> std::result::Result<f64, FunctionError> {
    match args.get(1) {
        Some(w) => Ok(dimension(w)?.value / 100.0),
        None => Ok(0.5),
    }
}

fn tint(args: &[Value]) -> Result {
    let c = color(arg(args, 0)?)?;
    Ok(Value::Color(mix_colors(&Color::white(), c, weight_or_half(args)?)))
}

fn shade(args: &[Value]) -> Result {
    let c = color(arg(args, 0)?)?;
    Ok(Value::Color(mix_colors(&Color::black(), c, weight_or_half(args)?)))
}

fn greyscale(args: &[Value]) -> Result {
    let c = color(arg(args, 0)?)?;
    let (h, _, l) = c.to_hsl();
    Ok(Value::Color(Color::from_hsl(h, 0.0, l, c.alpha)))
}

fn contrast(args: &[Value]) -> Result {
    let c = match arg(args, 0)? {
        Value::Color(c) => c,
        other => return Err(wrong_type(other, "a color")),
    };
    let mut dark = match args.get(1) {
        Some(v) => color(v)?.clone(),
        None => Color::black(),
    };
    let mut light = match args.get(2) {
        Some(v) => color(v)?.clone(),
        None => Color::white(),
    };
    if dark.luma() > light.luma() {
        std::mem::swap(&mut dark, &mut light);
    }
    let threshold = match args.get(3) {
        Some(t) => number(t)?,
        None => 0.43,
    };
    Ok(Value::Color(if c.luma() < threshold { light } else { dark }))
}

fn screen_mode(cb: f64, cs: f64) -> f64 {
    cb + cs - cb * cs
}

fn overlay_mode(cb: f64, cs: f64) -> f64 {
    let cb = cb * 2.0;
    if cb <= 1.0 {
        cb * cs
    } else {
        screen_mode(cb - 1.0, cs)
    }
}

fn softlight_mode(cb: f64, cs: f64) -> f64 {
    let (mut d, mut e) = (1.0, cb);
    if cs > 0.5 {
        e = 1.0;
        d = if cb > 0.25 {
            cb.sqrt()
        } else {
            ((16.0 * cb - 12.0) * cb + 4.0) * cb
        };
    }
    cb - (1.0 - 2.0 * cs) * e * (d - cb)
}

/// Separable blend of two colors, compositing by their alphas.
fn blend(args: &[Value], mode: fn(f64, f64) -> f64) -> Result {
    let backdrop = color(arg(args, 0)?)?;
    let source = color(arg(args, 1)?)?;
    let (ab, as_) = (backdrop.alpha, source.alpha);
    let ar = as_ + ab * (1.0 - as_);
    let mut channels = [0.0; 3];
    for (i, (cb, cs)) in backdrop.channels().into_iter().zip(source.channels()).enumerate() {
        let (cb, cs) = (cb / 255.0, cs / 255.0);
        let mut cr = mode(cb, cs);
        if ar != 0.0 {
            cr = (as_ * cs + ab * (cb - as_ * (cb + cs - cr))) / ar;
        }
        channels[i] = cr * 255.0;
    }
    Ok(Value::Color(Color::rgba(channels[0], channels[1], channels[2], ar)))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{call, hex, num};
    use crate::ast::Value;
    use crate::functions::{dim, FunctionError};

    fn css(value: Result<Value, FunctionError>) -> String {
        value.unwrap().to_string()
    }

    #[test]
    fn test_color_definitions() {
        assert_eq!(css(call("rgb", &[num(255.0), num(0.0), num(0.0)])), "#ff0000");
        assert_eq!(
            css(call("rgba", &[num(0.0), num(0.0), num(0.0), dim(50.0, "%")])),
            "rgba(0, 0, 0, 0.5)"
        );
        assert_eq!(css(call("hsl", &[num(120.0), dim(100.0, "%"), dim(25.0, "%")])), "#008000");
        assert_eq!(css(call("argb", &[hex("#ff0000")])), "#ffff0000");
    }

    #[test]
    fn test_lighten_and_darken() {
        assert_eq!(css(call("lighten", &[hex("#000"), dim(50.0, "%")])), "#808080");
        assert_eq!(css(call("darken", &[hex("#fff"), dim(100.0, "%")])), "#000000");
    }

    #[test]
    fn test_fade_family() {
        assert_eq!(css(call("fade", &[hex("#000"), dim(25.0, "%")])), "rgba(0, 0, 0, 0.25)");
        assert_eq!(css(call("fadeout", &[hex("#000"), dim(10.0, "%")])), "rgba(0, 0, 0, 0.9)");
    }

    #[test]
    fn test_mix_tint_shade() {
        assert_eq!(css(call("mix", &[hex("#ff0000"), hex("#0000ff")])), "#800080");
        assert_eq!(css(call("tint", &[hex("#000"), dim(50.0, "%")])), "#808080");
        assert_eq!(css(call("shade", &[hex("#fff"), dim(100.0, "%")])), "#000000");
    }

    #[test]
    fn test_channels() {
        assert_eq!(css(call("red", &[hex("#102030")])), "16");
        assert_eq!(css(call("lightness", &[hex("#fff")])), "100%");
        assert_eq!(css(call("spin", &[hex("#ff0000"), num(120.0)])), "#00ff00");
    }

    #[test]
    fn test_contrast_picks_readable_side() {
        assert_eq!(css(call("contrast", &[hex("#eee")])), "#000000");
        assert_eq!(css(call("contrast", &[hex("#222")])), "#ffffff");
    }

    #[test]
    fn test_blending() {
        assert_eq!(css(call("multiply", &[hex("#ff6600"), hex("#999999")])), "#993d00");
        assert_eq!(css(call("average", &[hex("#ff0000"), hex("#0000ff")])), "#800080");
    }

    #[test]
    fn test_wrong_types() {
        assert!(matches!(call("lighten", &[num(1.0), num(1.0)]), Err(FunctionError::Failed(_))));
        assert_eq!(call("rgb", &[num(1.0)]), Err(FunctionError::Unsupported));
    }
}
