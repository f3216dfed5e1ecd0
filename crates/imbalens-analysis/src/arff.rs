//! ARFF loading and one-hot encoding
//!
//! Streams are stored as ARFF files: a header of `@attribute` declarations
//! followed by comma-separated `@data` rows in arrival order.
//!
//! ```text
//! % comment
//! @relation stream
//! @attribute x numeric
//! @attribute colour {red, green}
//! @attribute class {neg, pos}
//! @data
//! 0.5, red, neg
//! 1.5, green, pos
//! ```
//!
//! The loader turns such a file into a [`Dataset`]:
//!
//! - The class attribute is the one named `class` if present, otherwise the
//!   last attribute. It must be nominal; its declared values are the classes.
//! - Numeric attributes (`numeric`, `real`, `integer`) are copied as-is.
//! - Other nominal attributes are one-hot encoded into one `0/1` column per
//!   declared value, placed after all numeric columns. A missing (`?`) nominal
//!   value encodes as all zeros.
//!
//! Sparse rows, `string` and `date` attributes are not supported.

use crate::dataset::{Dataset, DatasetError};

/// Name of the attribute used as class when no explicit name is given
pub const DEFAULT_CLASS_ATTRIBUTE: &str = "class";

const MISSING: &str = "?";

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ArffError {
    #[display("line {line}: malformed @attribute declaration")]
    MalformedAttribute { line: usize },
    #[display("line {line}: unsupported type '{kind}' for attribute '{name}'")]
    UnsupportedType {
        line: usize,
        name: String,
        kind: String,
    },
    #[display("line {line}: unterminated quoted value")]
    UnterminatedQuote { line: usize },
    #[display("line {line}: sparse data rows are not supported")]
    SparseData { line: usize },
    #[display("no @attribute declarations found")]
    NoAttributes,
    #[display("no @data section found")]
    NoData,
    #[display("class attribute '{name}' not found")]
    ClassNotFound { name: String },
    #[display("class attribute '{name}' must be nominal")]
    ClassNotNominal { name: String },
    #[display("line {line}: expected {expected} values, found {actual}")]
    FieldCount {
        line: usize,
        expected: usize,
        actual: usize,
    },
    #[display("line {line}: invalid numeric value '{value}' for attribute '{attribute}'")]
    InvalidNumber {
        line: usize,
        attribute: String,
        value: String,
    },
    #[display("line {line}: missing value for numeric attribute '{attribute}'")]
    MissingNumeric { line: usize, attribute: String },
    #[display("line {line}: missing class value")]
    MissingClass { line: usize },
    #[display("line {line}: value '{value}' is not declared for attribute '{attribute}'")]
    UndeclaredValue {
        line: usize,
        attribute: String,
        value: String,
    },
    #[display("invalid dataset: {_0}")]
    Dataset(DatasetError),
}

/// Declared type of an attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    Numeric,
    Nominal(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

/// Parse ARFF text into a dataset.
///
/// `class_attribute` overrides the class attribute name; by default the
/// attribute named [`DEFAULT_CLASS_ATTRIBUTE`] is used, falling back to the
/// last declared attribute.
///
/// # Examples
///
/// ```
/// use imbalens_analysis::arff;
///
/// let text = "@relation r\n@attribute x numeric\n@attribute class {a,b}\n@data\n1,a\n2,b\n";
/// let dataset = arff::parse(text, None).unwrap();
/// assert_eq!(dataset.len(), 2);
/// assert_eq!(dataset.class_names(), ["a", "b"]);
/// ```
pub fn parse(text: &str, class_attribute: Option<&str>) -> Result<Dataset, ArffError> {
    let mut attributes = Vec::new();
    let mut data_start = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("@data") {
            data_start = Some(idx + 1);
            break;
        }
        if lower.starts_with("@attribute") {
            attributes.push(parse_attribute(&line["@attribute".len()..], line_no)?);
        }
        // @relation and unknown header keywords carry nothing we need
    }

    if attributes.is_empty() {
        return Err(ArffError::NoAttributes);
    }
    let data_start = data_start.ok_or(ArffError::NoData)?;

    let class_pos = find_class_attribute(&attributes, class_attribute)?;
    let AttributeKind::Nominal(class_names) = &attributes[class_pos].kind else {
        return Err(ArffError::ClassNotNominal {
            name: attributes[class_pos].name.clone(),
        });
    };
    let encoder = Encoder::new(&attributes, class_pos);

    let mut features = Vec::new();
    let mut labels = Vec::new();
    for (idx, raw_line) in text.lines().enumerate().skip(data_start) {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('%') {
            continue;
        }
        if line.starts_with('{') {
            return Err(ArffError::SparseData { line: line_no });
        }
        let values = split_values(line, line_no)?;
        if values.len() != attributes.len() {
            return Err(ArffError::FieldCount {
                line: line_no,
                expected: attributes.len(),
                actual: values.len(),
            });
        }

        let class_value = &values[class_pos];
        if class_value == MISSING {
            return Err(ArffError::MissingClass { line: line_no });
        }
        let label = class_names
            .iter()
            .position(|name| name == class_value)
            .ok_or_else(|| ArffError::UndeclaredValue {
                line: line_no,
                attribute: attributes[class_pos].name.clone(),
                value: class_value.clone(),
            })?;

        features.push(encoder.encode(&values, line_no)?);
        labels.push(label);
    }

    log::debug!(
        "parsed {} rows with {} attributes ({} encoded features)",
        labels.len(),
        attributes.len(),
        encoder.feature_names.len()
    );

    Dataset::new(
        encoder.feature_names,
        class_names.clone(),
        features,
        labels,
    )
    .map_err(ArffError::Dataset)
}

fn find_class_attribute(
    attributes: &[Attribute],
    class_attribute: Option<&str>,
) -> Result<usize, ArffError> {
    match class_attribute {
        Some(name) => attributes
            .iter()
            .position(|attr| attr.name == name)
            .ok_or_else(|| ArffError::ClassNotFound {
                name: name.to_owned(),
            }),
        None => Ok(attributes
            .iter()
            .position(|attr| attr.name == DEFAULT_CLASS_ATTRIBUTE)
            .unwrap_or(attributes.len() - 1)),
    }
}

fn parse_attribute(rest: &str, line: usize) -> Result<Attribute, ArffError> {
    let rest = rest.trim_start();
    let (name, rest) = take_name(rest, line)?;
    let kind_text = rest.trim();
    if kind_text.is_empty() {
        return Err(ArffError::MalformedAttribute { line });
    }

    let kind = if let Some(body) = kind_text.strip_prefix('{') {
        let body = body
            .strip_suffix('}')
            .ok_or(ArffError::MalformedAttribute { line })?;
        let values = split_values(body, line)?;
        if values.iter().any(String::is_empty) {
            return Err(ArffError::MalformedAttribute { line });
        }
        AttributeKind::Nominal(values)
    } else {
        match kind_text.to_ascii_lowercase().as_str() {
            "numeric" | "real" | "integer" => AttributeKind::Numeric,
            _ => {
                return Err(ArffError::UnsupportedType {
                    line,
                    name,
                    kind: kind_text.to_owned(),
                });
            }
        }
    };

    Ok(Attribute { name, kind })
}

/// Split off a possibly quoted attribute name.
fn take_name(text: &str, line: usize) -> Result<(String, &str), ArffError> {
    let mut chars = text.char_indices();
    match chars.next() {
        Some((_, quote @ ('\'' | '"'))) => {
            let end = text[1..]
                .find(quote)
                .ok_or(ArffError::UnterminatedQuote { line })?;
            Ok((text[1..=end].to_owned(), &text[end + 2..]))
        }
        Some(_) => {
            let end = text
                .find(|c: char| c.is_whitespace() || c == '{')
                .ok_or(ArffError::MalformedAttribute { line })?;
            Ok((text[..end].to_owned(), &text[end..]))
        }
        None => Err(ArffError::MalformedAttribute { line }),
    }
}

/// Split a comma-separated list, honouring single and double quotes and
/// backslash escapes inside quotes. Values are trimmed.
fn split_values(text: &str, line: usize) -> Result<Vec<String>, ArffError> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut quote = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) if c == '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == ',' => values.push(finish_value(&mut current)),
            None => current.push(c),
        }
    }
    if quote.is_some() {
        return Err(ArffError::UnterminatedQuote { line });
    }
    values.push(finish_value(&mut current));
    Ok(values)
}

fn finish_value(current: &mut String) -> String {
    let value = std::mem::take(current);
    value.trim().to_owned()
}

/// Column layout of encoded rows: numeric columns first, then one-hot blocks
#[derive(Debug)]
struct Encoder<'a> {
    attributes: &'a [Attribute],
    numeric: Vec<usize>,
    nominal: Vec<usize>,
    feature_names: Vec<String>,
}

impl<'a> Encoder<'a> {
    fn new(attributes: &'a [Attribute], class_pos: usize) -> Self {
        let mut numeric = Vec::new();
        let mut nominal = Vec::new();
        for (pos, attr) in attributes.iter().enumerate() {
            if pos == class_pos {
                continue;
            }
            match attr.kind {
                AttributeKind::Numeric => numeric.push(pos),
                AttributeKind::Nominal(_) => nominal.push(pos),
            }
        }

        let mut feature_names = numeric
            .iter()
            .map(|&pos| attributes[pos].name.clone())
            .collect::<Vec<_>>();
        for &pos in &nominal {
            let attr = &attributes[pos];
            if let AttributeKind::Nominal(values) = &attr.kind {
                feature_names.extend(values.iter().map(|value| format!("{}_{value}", attr.name)));
            }
        }

        Self {
            attributes,
            numeric,
            nominal,
            feature_names,
        }
    }

    fn encode(&self, values: &[String], line: usize) -> Result<Vec<f64>, ArffError> {
        let mut row = Vec::with_capacity(self.feature_names.len());
        for &pos in &self.numeric {
            let value = &values[pos];
            let attribute = &self.attributes[pos].name;
            if value == MISSING {
                return Err(ArffError::MissingNumeric {
                    line,
                    attribute: attribute.clone(),
                });
            }
            let number = value.parse::<f64>().map_err(|_| ArffError::InvalidNumber {
                line,
                attribute: attribute.clone(),
                value: value.clone(),
            })?;
            row.push(number);
        }
        for &pos in &self.nominal {
            let attr = &self.attributes[pos];
            let AttributeKind::Nominal(declared) = &attr.kind else {
                continue;
            };
            let value = &values[pos];
            let hot = if value == MISSING {
                None
            } else {
                Some(declared.iter().position(|d| d == value).ok_or_else(|| {
                    ArffError::UndeclaredValue {
                        line,
                        attribute: attr.name.clone(),
                        value: value.clone(),
                    }
                })?)
            };
            row.extend((0..declared.len()).map(|i| if Some(i) == hot { 1.0 } else { 0.0 }));
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
% synthetic stream
@RELATION sample

@ATTRIBUTE x NUMERIC
@attribute 'colour name' {red, 'light green', blue}
@attribute y real
@attribute class {neg,pos}

@data
1.0, red, 2.5, neg
% interleaved comment
2.0, 'light green', -1, pos
3e1, ?, 0, neg
";

    #[test]
    fn test_parse_one_hot_encodes_nominal_attributes() {
        let dataset = parse(SAMPLE, None).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.class_names(), ["neg", "pos"]);
        assert_eq!(
            dataset.feature_names(),
            [
                "x",
                "y",
                "colour name_red",
                "colour name_light green",
                "colour name_blue"
            ]
        );
        assert_eq!(
            dataset.rows(0..3),
            [
                vec![1.0, 2.5, 1.0, 0.0, 0.0],
                vec![2.0, -1.0, 0.0, 1.0, 0.0],
                vec![30.0, 0.0, 0.0, 0.0, 0.0],
            ]
        );
        assert_eq!(dataset.labels(0..3), [0, 1, 0]);
    }

    #[test]
    fn test_last_attribute_is_class_by_default() {
        let text = "@attribute a numeric\n@attribute target {p,q,r}\n@data\n1,r\n2,p\n";
        let dataset = parse(text, None).unwrap();
        assert_eq!(dataset.class_names(), ["p", "q", "r"]);
        assert_eq!(dataset.labels(0..2), [2, 0]);
    }

    #[test]
    fn test_explicit_class_attribute() {
        let text = "@attribute label {a,b}\n@attribute v numeric\n@data\nb,1\na,2\n";
        let dataset = parse(text, Some("label")).unwrap();
        assert_eq!(dataset.feature_names(), ["v"]);
        assert_eq!(dataset.labels(0..2), [1, 0]);

        let err = parse(text, Some("missing")).unwrap_err();
        assert_eq!(
            err,
            ArffError::ClassNotFound {
                name: "missing".into()
            }
        );
    }

    #[test]
    fn test_numeric_class_is_rejected() {
        let text = "@attribute a {x,y}\n@attribute class numeric\n@data\nx,1\n";
        assert!(matches!(
            parse(text, None),
            Err(ArffError::ClassNotNominal { .. })
        ));
    }

    #[test]
    fn test_data_errors_report_line_numbers() {
        let header = "@attribute a numeric\n@attribute class {x,y}\n@data\n";

        let err = parse(&format!("{header}1,x\nfoo,y\n"), None).unwrap_err();
        assert!(matches!(err, ArffError::InvalidNumber { line: 5, .. }));

        let err = parse(&format!("{header}?,x\n"), None).unwrap_err();
        assert!(matches!(err, ArffError::MissingNumeric { line: 4, .. }));

        let err = parse(&format!("{header}1,?\n"), None).unwrap_err();
        assert_eq!(err, ArffError::MissingClass { line: 4 });

        let err = parse(&format!("{header}1,z\n"), None).unwrap_err();
        assert!(matches!(err, ArffError::UndeclaredValue { line: 4, .. }));

        let err = parse(&format!("{header}1\n"), None).unwrap_err();
        assert_eq!(
            err,
            ArffError::FieldCount {
                line: 4,
                expected: 2,
                actual: 1
            }
        );

        let err = parse(&format!("{header}{{0 1, 1 x}}\n"), None).unwrap_err();
        assert_eq!(err, ArffError::SparseData { line: 4 });
    }

    #[test]
    fn test_header_errors() {
        assert_eq!(parse("@data\n", None).unwrap_err(), ArffError::NoAttributes);
        assert_eq!(
            parse("@attribute class {a}\n", None).unwrap_err(),
            ArffError::NoData
        );
        assert!(matches!(
            parse("@attribute s string\n@data\n", None),
            Err(ArffError::UnsupportedType { line: 1, .. })
        ));
        assert_eq!(
            parse("@attribute 'open {a}\n@data\n", None).unwrap_err(),
            ArffError::UnterminatedQuote { line: 1 }
        );
    }

    #[test]
    fn test_split_values_keeps_commas_inside_quotes() {
        let values = split_values(r#"'a,b', "c\"d" , e "#, 1).unwrap();
        assert_eq!(values, ["a,b", "c\"d", "e"]);
    }
}
