//! Decoded geometry arguments for the kernel builders.
//!
//! Named kernels take an ImageMagick-style geometry argument,
//! `"{rho}x{sigma}{+xi}{+psi}{flags}"`, for example `"0x2"` for a Gaussian
//! with automatic support and a standard deviation of 2, or the comma form
//! `"5,1,45"` for the convenience of hand-written kernel strings.  The
//! builders only ever see the decoded [`KernelArgs`] struct.

use crate::error::ValueErrorKind;

/// Which parts of a geometry string were actually present, plus modifiers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GeometryFlags {
    pub rho: bool,
    pub sigma: bool,
    pub xi: bool,
    pub psi: bool,

    /// `%` - interpret the value as a percentage.
    pub percent: bool,
    /// `!` - aspect override.
    pub aspect: bool,
    /// `^` - expand the kernel by 90 degree rotations.
    pub expand_90: bool,
    /// `@` - expand the kernel by 45 degree rotations.
    pub expand_45: bool,
}

/// A decoded kernel argument set.
///
/// Unset fields hold the builder defaults for the kernel family; check
/// `flags` to learn whether the user supplied a value.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct KernelArgs {
    pub rho: f64,
    pub sigma: f64,
    pub xi: f64,
    pub psi: f64,
    pub flags: GeometryFlags,
}

impl KernelArgs {
    /// Parses a geometry string into a `KernelArgs`.
    ///
    /// The accepted surface form is `[rho][x sigma][{+,-}xi][{+,-}psi]` with
    /// the modifier characters `% ! ^ @` allowed before, between or after the
    /// numbers, which is what the original geometry convention allows.
    /// Numbers may also be comma-separated (`"5,1,45"` ≡ `"5x1+45"`).
    pub fn parse(s: &str) -> Result<KernelArgs, ValueErrorKind> {
        let mut args = KernelArgs::default();
        let mut parser = GeometryParser::new(s);

        if let Some(v) = parser.number(false)? {
            args.rho = v;
            args.flags.rho = true;
        }

        if parser.advance_over_separator() {
            if let Some(v) = parser.number(false)? {
                args.sigma = v;
                args.flags.sigma = true;
            }
        }

        if let Some(v) = parser.number(true)? {
            args.xi = v;
            args.flags.xi = true;

            if let Some(v) = parser.number(true)? {
                args.psi = v;
                args.flags.psi = true;
            }
        }

        parser.finish(&mut args.flags)?;

        Ok(args)
    }
}

struct GeometryParser<'a> {
    input: &'a [u8],
    pos: usize,
    flags: GeometryFlags,
}

impl<'a> GeometryParser<'a> {
    fn new(s: &'a str) -> GeometryParser<'a> {
        GeometryParser {
            input: s.trim().as_bytes(),
            pos: 0,
            flags: GeometryFlags::default(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Eats modifier characters and whitespace, remembering the modifiers.
    fn advance_over_flags(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                b'%' => self.flags.percent = true,
                b'!' => self.flags.aspect = true,
                b'^' => self.flags.expand_90 = true,
                b'@' => self.flags.expand_45 = true,
                b' ' => (),
                _ => return,
            }
            self.pos += 1;
        }
    }

    /// Eats an `x` or `,` number separator, reporting whether one was there.
    fn advance_over_separator(&mut self) -> bool {
        self.advance_over_flags();
        match self.peek() {
            Some(b'x') | Some(b'X') | Some(b',') => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Parses the next number.  Offsets (`signed`) require an explicit
    /// leading `+` or `-`; a `,` separator is accepted in its place.
    fn number(&mut self, signed: bool) -> Result<Option<f64>, ValueErrorKind> {
        self.advance_over_flags();

        match self.peek() {
            Some(b'+') | Some(b'-') => (),
            Some(b',') if signed => {
                self.pos += 1;
                self.advance_over_flags();
            }
            Some(c) if (c.is_ascii_digit() || c == b'.') && !signed => (),
            _ => return Ok(None),
        }

        let num_start = self.pos;

        if let Some(b'+') | Some(b'-') = self.peek() {
            self.pos += 1;
        }

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == b'.' || c == b'e' || c == b'E' {
                self.pos += 1;
            } else if (c == b'+' || c == b'-')
                && matches!(self.input.get(self.pos - 1), Some(b'e') | Some(b'E'))
            {
                self.pos += 1;
            } else {
                break;
            }
        }

        if self.pos == num_start {
            return Ok(None);
        }

        let text = std::str::from_utf8(&self.input[num_start..self.pos])
            .map_err(|_| ValueErrorKind::parse_error("geometry is not valid UTF-8"))?;
        let text = text.strip_prefix('+').unwrap_or(text);

        text.parse::<f64>().map(Some).map_err(|_| {
            ValueErrorKind::parse_error(&format!("invalid number {:?} in geometry", text))
        })
    }

    /// Consumes trailing flags and requires the input to be exhausted.
    fn finish(mut self, flags: &mut GeometryFlags) -> Result<(), ValueErrorKind> {
        self.advance_over_flags();

        flags.percent |= self.flags.percent;
        flags.aspect |= self.flags.aspect;
        flags.expand_90 |= self.flags.expand_90;
        flags.expand_45 |= self.flags.expand_45;

        if self.pos != self.input.len() {
            return Err(ValueErrorKind::parse_error(&format!(
                "unexpected {:?} in geometry",
                char::from(self.input[self.pos])
            )));
        }

        Ok(())
    }
}
