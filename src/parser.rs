//! Tokenizer for binding path expressions.
//!
//! A path is a sequence of steps separated by `.`:
//!
//! - `Name`: a property
//! - `(Owner.Name)`: an attached property, qualified by its owner type
//! - `[contents]`: an indexer; the contents stay opaque until a node knows
//!   whether its source is positional or keyed
//!
//! An indexer may follow another step without a dot (`Items[2]`) and
//! indexers chain (`Grid[1][2]`). The parser is a plain iterator over the
//! input; it keeps no state beyond its cursor and is restarted by building a
//! new one.

use strum::Display;

/// The kind of a [`PathStep`], with `None` marking the end of the path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum StepKind {
    Property,
    AttachedProperty,
    Indexed,
    None,
}

/// One parsed segment of a path expression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathStep<'a> {
    Property { name: &'a str },
    AttachedProperty { owner: &'a str, name: &'a str },
    Indexed { index: &'a str },
}

impl<'a> PathStep<'a> {
    pub fn kind(&self) -> StepKind {
        match self {
            PathStep::Property { .. } => StepKind::Property,
            PathStep::AttachedProperty { .. } => StepKind::AttachedProperty,
            PathStep::Indexed { .. } => StepKind::Indexed,
        }
    }
}

/// Flat view of a step: kind, owner type, property name and index.
pub type StepParts<'a> = (StepKind, Option<&'a str>, Option<&'a str>, Option<&'a str>);

/// Why a path failed to parse.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("expected a property name")]
    EmptySegment,
    #[error("`{0}` is not a valid property name")]
    InvalidIdentifier(String),
    #[error("unexpected character `{0}`")]
    UnexpectedCharacter(char),
    #[error("indexer is not closed, expected `]`")]
    UnterminatedIndexer,
    #[error("indexer is empty")]
    EmptyIndex,
    #[error("attached property is not closed, expected `)`")]
    UnterminatedAttachedProperty,
    #[error("attached property `{0}` must be written as `(Owner.Name)`")]
    MissingOwnerType(String),
}

/// A malformed path expression.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid binding path `{path}` at offset {offset}: {kind}")]
pub struct ParseError {
    /// The whole path being parsed.
    pub path: String,
    /// Byte offset of the failure in `path`.
    pub offset: usize,
    pub kind: ParseErrorKind,
}

/// Stateless-by-construction parser over one path expression.
///
/// # Example
///
/// ```rust
/// use floem_databind::parser::{PathParser, PathStep};
///
/// let steps: Result<Vec<_>, _> = PathParser::new("Items[2].(Grid.Row)").collect();
/// assert_eq!(
///     steps.unwrap(),
///     vec![
///         PathStep::Property { name: "Items" },
///         PathStep::Indexed { index: "2" },
///         PathStep::AttachedProperty { owner: "Grid", name: "Row" },
///     ]
/// );
/// ```
#[derive(Clone, Debug)]
pub struct PathParser<'a> {
    path: &'a str,
    pos: usize,
    has_step: bool,
    after_dot: bool,
    done: bool,
}

impl<'a> PathParser<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            pos: 0,
            has_step: false,
            after_dot: false,
            done: false,
        }
    }

    /// The next step in flat form; `StepKind::None` once the path is exhausted.
    pub fn step(&mut self) -> Result<StepParts<'a>, ParseError> {
        let Some(step) = self.next().transpose()? else {
            return Ok((StepKind::None, None, None, None));
        };
        let (owner, name, index) = match step {
            PathStep::Property { name } => (None, Some(name), None),
            PathStep::AttachedProperty { owner, name } => (Some(owner), Some(name), None),
            PathStep::Indexed { index } => (None, None, Some(index)),
        };
        Ok((step.kind(), owner, name, index))
    }

    fn error(&self, offset: usize, kind: ParseErrorKind) -> ParseError {
        ParseError {
            path: self.path.to_owned(),
            offset,
            kind,
        }
    }

    fn rest(&self) -> &'a str {
        &self.path[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn parse_step(&mut self) -> Option<Result<PathStep<'a>, ParseError>> {
        loop {
            self.skip_whitespace();
            let Some(c) = self.rest().chars().next() else {
                if self.after_dot {
                    return Some(Err(self.error(self.pos, ParseErrorKind::EmptySegment)));
                }
                return None;
            };

            if self.has_step && !self.after_dot {
                match c {
                    '.' => {
                        self.pos += 1;
                        self.after_dot = true;
                        continue;
                    }
                    '[' => {}
                    c => {
                        return Some(Err(
                            self.error(self.pos, ParseErrorKind::UnexpectedCharacter(c))
                        ))
                    }
                }
            }

            return Some(match c {
                '[' => self.indexer(),
                '(' => self.attached_property(),
                '.' => Err(self.error(self.pos, ParseErrorKind::EmptySegment)),
                ']' | ')' => Err(self.error(self.pos, ParseErrorKind::UnexpectedCharacter(c))),
                _ => self.property(),
            });
        }
    }

    fn property(&mut self) -> Result<PathStep<'a>, ParseError> {
        let start = self.pos;
        let rest = self.rest();
        let len = rest
            .find(|c: char| matches!(c, '.' | '[' | ']' | '(' | ')'))
            .unwrap_or(rest.len());
        let name = rest[..len].trim_end();
        validate_identifier(name).map_err(|kind| self.error(start, kind))?;
        self.pos += len;
        Ok(PathStep::Property { name })
    }

    fn indexer(&mut self) -> Result<PathStep<'a>, ParseError> {
        let open = self.pos;
        let rest = self.rest();
        let close = rest
            .find(']')
            .ok_or_else(|| self.error(open, ParseErrorKind::UnterminatedIndexer))?;
        let index = &rest[1..close];
        if index.trim().is_empty() {
            return Err(self.error(open, ParseErrorKind::EmptyIndex));
        }
        self.pos += close + 1;
        Ok(PathStep::Indexed { index })
    }

    fn attached_property(&mut self) -> Result<PathStep<'a>, ParseError> {
        let open = self.pos;
        let rest = self.rest();
        let close = rest
            .find(')')
            .ok_or_else(|| self.error(open, ParseErrorKind::UnterminatedAttachedProperty))?;
        let inner = rest[1..close].trim();
        let (owner, name) = inner
            .rsplit_once('.')
            .map(|(owner, name)| (owner.trim(), name.trim()))
            .filter(|(owner, _)| !owner.is_empty())
            .ok_or_else(|| {
                self.error(open, ParseErrorKind::MissingOwnerType(inner.to_owned()))
            })?;
        validate_owner(owner).map_err(|kind| self.error(open + 1, kind))?;
        validate_identifier(name).map_err(|kind| self.error(open + 1, kind))?;
        self.pos += close + 1;
        Ok(PathStep::AttachedProperty { owner, name })
    }
}

impl<'a> Iterator for PathParser<'a> {
    type Item = Result<PathStep<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let step = self.parse_step();
        match &step {
            Some(Ok(_)) => {
                self.has_step = true;
                self.after_dot = false;
            }
            Some(Err(_)) | None => self.done = true,
        }
        step
    }
}

fn validate_identifier(name: &str) -> Result<(), ParseErrorKind> {
    let mut chars = name.chars();
    match chars.next() {
        None => Err(ParseErrorKind::EmptySegment),
        Some(first) if first.is_alphabetic() || first == '_' => {
            if chars.all(|c| c.is_alphanumeric() || c == '_') {
                Ok(())
            } else {
                Err(ParseErrorKind::InvalidIdentifier(name.to_owned()))
            }
        }
        Some(_) => Err(ParseErrorKind::InvalidIdentifier(name.to_owned())),
    }
}

/// Owner types may carry a namespace prefix, as in `local:Grid`.
fn validate_owner(owner: &str) -> Result<(), ParseErrorKind> {
    match owner.split_once(':') {
        Some((prefix, ty)) => validate_identifier(prefix).and_then(|()| validate_identifier(ty)),
        None => validate_identifier(owner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str) -> Result<Vec<PathStep<'_>>, ParseError> {
        PathParser::new(path).collect()
    }

    #[test]
    fn empty_path_has_no_steps() {
        assert_eq!(parse(""), Ok(vec![]));
        assert_eq!(parse("   "), Ok(vec![]));
        assert_eq!(PathParser::new("").step().unwrap().0, StepKind::None);
    }

    #[test]
    fn dotted_properties() {
        assert_eq!(
            parse("Address.City").unwrap(),
            vec![
                PathStep::Property { name: "Address" },
                PathStep::Property { name: "City" },
            ]
        );
        assert_eq!(
            parse(" Address . City ").unwrap(),
            vec![
                PathStep::Property { name: "Address" },
                PathStep::Property { name: "City" },
            ]
        );
    }

    #[test]
    fn indexers_attach_with_or_without_a_dot() {
        let expected = vec![
            PathStep::Property { name: "Items" },
            PathStep::Indexed { index: "2" },
            PathStep::Indexed { index: "key" },
        ];
        assert_eq!(parse("Items[2][key]").unwrap(), expected);
        assert_eq!(parse("Items.[2].[key]").unwrap(), expected);
        assert_eq!(parse("[0]").unwrap(), vec![PathStep::Indexed { index: "0" }]);
    }

    #[test]
    fn index_contents_are_kept_verbatim() {
        assert_eq!(
            parse("Map[ two words ]").unwrap()[1],
            PathStep::Indexed {
                index: " two words "
            }
        );
    }

    #[test]
    fn attached_properties_carry_the_owner() {
        let mut parser = PathParser::new("(Grid.Row).Value");
        assert_eq!(
            parser.step().unwrap(),
            (StepKind::AttachedProperty, Some("Grid"), Some("Row"), None)
        );
        assert_eq!(
            parser.step().unwrap(),
            (StepKind::Property, None, Some("Value"), None)
        );
        assert_eq!(parser.step().unwrap(), (StepKind::None, None, None, None));

        assert_eq!(
            parse("(local:Canvas.Left)").unwrap(),
            vec![PathStep::AttachedProperty {
                owner: "local:Canvas",
                name: "Left"
            }]
        );
    }

    #[test]
    fn malformed_paths_are_rejected() {
        let kind = |path| parse(path).unwrap_err().kind;
        assert_eq!(kind("Address..City"), ParseErrorKind::EmptySegment);
        assert_eq!(kind("Address."), ParseErrorKind::EmptySegment);
        assert_eq!(kind(".Address"), ParseErrorKind::EmptySegment);
        assert_eq!(kind("Items[2"), ParseErrorKind::UnterminatedIndexer);
        assert_eq!(kind("Items[]"), ParseErrorKind::EmptyIndex);
        assert_eq!(kind("(Grid.Row"), ParseErrorKind::UnterminatedAttachedProperty);
        assert_eq!(
            kind("(Row)"),
            ParseErrorKind::MissingOwnerType("Row".to_owned())
        );
        assert_eq!(kind("Items]"), ParseErrorKind::UnexpectedCharacter(']'));
        assert_eq!(kind("(Grid.Row)Value"), ParseErrorKind::UnexpectedCharacter('V'));
        assert_eq!(
            kind("First Name"),
            ParseErrorKind::InvalidIdentifier("First Name".to_owned())
        );
        assert_eq!(
            kind("1st"),
            ParseErrorKind::InvalidIdentifier("1st".to_owned())
        );
    }

    #[test]
    fn errors_report_the_offset() {
        let error = parse("Address.Items[3").unwrap_err();
        assert_eq!(error.offset, 13);
        assert_eq!(
            error.to_string(),
            "invalid binding path `Address.Items[3` at offset 13: indexer is not closed, expected `]`"
        );
    }

    #[test]
    fn parsing_stops_after_an_error() {
        let mut parser = PathParser::new("A..B");
        assert!(matches!(parser.next(), Some(Ok(_))));
        assert!(matches!(parser.next(), Some(Err(_))));
        assert!(parser.next().is_none());
    }
}
