//! Leaf lexers: numbers, units, names, colors.
//!
//! These are plain nom parsers over `&str`; the [`Cursor`](super::cursor::Cursor)
//! runs them through [`Cursor::nom`](super::cursor::Cursor::nom).

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while_m_n, take_while1},
    character::complete::{char, digit0, digit1, one_of},
    combinator::{not, opt, peek, recognize},
    multi::{many0_count, many1_count},
    sequence::{delimited, pair, preceded, tuple},
};

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || !c.is_ascii()
}

/// `\` followed by any character (or up to six hex digits).
fn escape(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        char('\\'),
        alt((
            recognize(pair(
                take_while_m_n(1, 6, |c: char| c.is_ascii_hexdigit()),
                opt(char(' ')),
            )),
            take_while_m_n(1, 1, |c: char| c != '\n'),
        )),
    ))(input)
}

fn name_chars(input: &str) -> IResult<&str, &str> {
    recognize(many0_count(alt((take_while1(is_name_char), escape))))(input)
}

/// A CSS identifier: `color`, `-webkit-box`, `--custom`, `\31 0`.
pub fn ident(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(tag("--"), name_chars)),
        recognize(tuple((
            opt(char('-')),
            alt((take_while_m_n(1, 1, is_name_start), escape)),
            name_chars,
        ))),
    ))(input)
}

/// A bare word in a value: `solid`, `sans-serif`, `-moz-box`, `\9`.
pub fn keyword(input: &str) -> IResult<&str, &str> {
    recognize(many1_count(alt((take_while1(is_name_char), escape))))(input)
}

/// `@{name}`
pub fn interpolation(input: &str) -> IResult<&str, &str> {
    recognize(delimited(tag("@{"), take_while1(is_name_char), char('}')))(input)
}

/// `${name}`
fn property_interpolation(input: &str) -> IResult<&str, &str> {
    recognize(delimited(tag("${"), take_while1(is_name_char), char('}')))(input)
}

/// A name that may contain `@{...}` interpolations, like `@{prefix}-color`
/// or `col-@{i}`.
pub fn interpolated_ident(input: &str) -> IResult<&str, &str> {
    recognize(many1_count(alt((
        interpolation,
        property_interpolation,
        take_while1(is_name_char),
        escape,
    ))))(input)
}

/// `@name` or `@@name`, returning the whole text.
pub fn variable(input: &str) -> IResult<&str, &str> {
    recognize(tuple((char('@'), opt(char('@')), take_while1(is_name_char))))(input)
}

/// `$name`
pub fn property_ref(input: &str) -> IResult<&str, &str> {
    recognize(pair(char('$'), take_while1(is_name_char)))(input)
}

/// An optionally signed decimal: `1`, `-1.5`, `.5`, `+2`.
pub fn number(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        opt(one_of("+-")),
        alt((recognize(tuple((digit0, char('.'), digit1))), digit1)),
    )))(input)
}

/// `%` or a run of letters directly after a number.
pub fn unit(input: &str) -> IResult<&str, &str> {
    alt((tag("%"), take_while1(|c: char| c.is_ascii_alphabetic())))(input)
}

/// A number with an optional unit.
pub fn dimension(input: &str) -> IResult<&str, (f64, &str)> {
    let (rest, text) = number(input)?;
    let (rest, unit) = opt(unit)(rest)?;
    // `1a2` is not a dimension.
    let (rest, _) =
        not(peek(take_while_m_n(1, 1, |c: char| c == '_' || c.is_ascii_digit())))(rest)?;
    let value = text
        .parse::<f64>()
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float)))?;
    Ok((rest, (value, unit.unwrap_or(""))))
}

/// `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`, not followed by name characters.
pub fn hex_color(input: &str) -> IResult<&str, &str> {
    let (rest, text) =
        recognize(preceded(char('#'), take_while1(|c: char| c.is_ascii_hexdigit())))(input)?;
    let digits = text.len() - 1;
    if !matches!(digits, 3 | 4 | 6 | 8) || rest.starts_with(is_name_char) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::HexDigit,
        )));
    }
    Ok((rest, text))
}

/// `U+0025-00FF`, `u+4??`
pub fn unicode_range(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        tag_no_case("u+"),
        take_while1(|c: char| c.is_ascii_hexdigit() || c == '?'),
        opt(pair(char('-'), take_while1(|c: char| c.is_ascii_hexdigit()))),
    )))(input)
}

/// `!important`, allowing space after the bang.
pub fn important(input: &str) -> IResult<&str, &str> {
    recognize(tuple((
        char('!'),
        take_while(|c: char| c == ' ' || c == '\t'),
        tag_no_case("important"),
    )))(input)
}

/// A function name: an identifier, `%`, or a dotted legacy name.
pub fn function_name(input: &str) -> IResult<&str, &str> {
    let (rest, name) = alt((
        tag("%"),
        recognize(pair(ident, many0_count(pair(one_of(".:"), ident)))),
    ))(input)?;
    let (_, _) = peek(char('('))(rest)?;
    Ok((rest, name))
}
