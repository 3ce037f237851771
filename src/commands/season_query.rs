use thiserror::Error;

/// One parsed season query token.
///
/// Year ranges accept "2020", "1999-2019", and the short form "2019-21".
/// Numbers under four digits are season numbers. Everything else is a
/// classification word; once one appears, the rest of the query must be
/// classification words too, and they join into a single group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeasonToken {
    Update,
    Years(i32, i32),
    Number(u32),
    Words(Vec<String>),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SeasonQueryError {
    #[error("season query is empty")]
    Empty,

    #[error("unsupported season query: {0}")]
    Unsupported(String),

    #[error("year or number cannot follow classification words: {0}")]
    TrailingToken(String),
}

/// Parse a season query into tokens, e.g. "update 2020 3" or
/// "1999-2019 C 🔂".
pub fn parse_query(words: &[String]) -> Result<Vec<SeasonToken>, SeasonQueryError> {
    if words.is_empty() {
        return Err(SeasonQueryError::Empty);
    }

    let mut tokens = Vec::new();
    let mut iter = words.iter();
    while let Some(word) = iter.next() {
        if word == "update" && tokens.is_empty() {
            tokens.push(SeasonToken::Update);
            continue;
        }
        match parse_token(word) {
            SeasonToken::Words(mut group) => {
                // All remaining words must also be classification words.
                for rest in iter.by_ref() {
                    match parse_token(rest) {
                        SeasonToken::Words(more) => group.extend(more),
                        _ => return Err(SeasonQueryError::TrailingToken(rest.clone())),
                    }
                }
                tokens.push(SeasonToken::Words(group));
            }
            token => tokens.push(token),
        }
    }
    Ok(tokens)
}

fn parse_token(word: &str) -> SeasonToken {
    let parts: Vec<&str> = word.split('-').collect();
    match parts.as_slice() {
        [min, max]
            if min.len() == 4
                && max.len() == 2
                && all_digits(min)
                && all_digits(max) =>
        {
            // Short range: "2019-21" means 2019 through 2021.
            let min_year: i32 = min.parse().expect("4 digits");
            let max_year: i32 = format!("{}{}", &min[..2], max).parse().expect("4 digits");
            SeasonToken::Years(min_year, max_year)
        }
        [min, max]
            if min.len() == 4
                && max.len() == 4
                && all_digits(min)
                && all_digits(max) =>
        {
            SeasonToken::Years(
                min.parse().expect("4 digits"),
                max.parse().expect("4 digits"),
            )
        }
        [year] if year.len() == 4 && all_digits(year) => {
            let year: i32 = year.parse().expect("4 digits");
            SeasonToken::Years(year, year)
        }
        [number] if !number.is_empty() && number.len() < 4 && all_digits(number) => {
            SeasonToken::Number(number.parse().expect("digits"))
        }
        _ => SeasonToken::Words(vec![word.to_uppercase()]),
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> Result<Vec<SeasonToken>, SeasonQueryError> {
        let words: Vec<String> = query.split_whitespace().map(str::to_string).collect();
        parse_query(&words)
    }

    #[test]
    fn test_year_and_number() {
        assert_eq!(
            parse("2020 3").unwrap(),
            vec![SeasonToken::Years(2020, 2020), SeasonToken::Number(3)]
        );
    }

    #[test]
    fn test_full_year_range() {
        assert_eq!(
            parse("1999-2019 💿").unwrap(),
            vec![
                SeasonToken::Years(1999, 2019),
                SeasonToken::Words(vec!["💿".to_string()])
            ]
        );
    }

    #[test]
    fn test_short_year_range() {
        assert_eq!(
            parse("2019-21 b").unwrap(),
            vec![
                SeasonToken::Years(2019, 2021),
                SeasonToken::Words(vec!["B".to_string()])
            ]
        );
    }

    #[test]
    fn test_update_keyword_first_only() {
        assert_eq!(
            parse("update 2020").unwrap(),
            vec![SeasonToken::Update, SeasonToken::Years(2020, 2020)]
        );
        // Not in first position, "update" is a classification word.
        assert_eq!(
            parse("2020 update").unwrap(),
            vec![
                SeasonToken::Years(2020, 2020),
                SeasonToken::Words(vec!["UPDATE".to_string()])
            ]
        );
    }

    #[test]
    fn test_trailing_words_join() {
        assert_eq!(
            parse("2020 C 🔂").unwrap(),
            vec![
                SeasonToken::Years(2020, 2020),
                SeasonToken::Words(vec!["C".to_string(), "🔂".to_string()])
            ]
        );
    }

    #[test]
    fn test_number_after_words_rejected() {
        assert_eq!(
            parse("2020 C 3"),
            Err(SeasonQueryError::TrailingToken("3".to_string()))
        );
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(parse(""), Err(SeasonQueryError::Empty));
    }

    #[test]
    fn test_large_number_is_year() {
        assert_eq!(parse("1234").unwrap(), vec![SeasonToken::Years(1234, 1234)]);
        assert_eq!(parse("123").unwrap(), vec![SeasonToken::Number(123)]);
    }
}
