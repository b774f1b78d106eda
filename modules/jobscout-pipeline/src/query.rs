//! Search query building: role config in, normalized descriptor out.

use jobscout_common::{
    Config, DateWindow, ExperienceLevel, RemoteMode, RoleConfig, SearchQuery, SearchSettings,
};

const SEARCH_BASE_URL: &str = "https://www.linkedin.com/jobs/search/";
pub const PAGE_SIZE: u32 = 25;

/// Build the immutable search descriptor for one configured role.
/// Precedence for the date window: role override, then shared search
/// settings, then the 24-hour default.
pub fn build_query(role: &RoleConfig, settings: &SearchSettings, config: &Config) -> SearchQuery {
    let date_window = role
        .date_posted
        .as_deref()
        .or(settings.date_posted.as_deref())
        .map(DateWindow::from_token)
        .unwrap_or_default();

    let experience_levels = match &role.experience_levels {
        Some(names) => names
            .iter()
            .filter_map(|n| ExperienceLevel::parse(n))
            .collect(),
        // Early-career default, matching the shipped roles file.
        None => vec![ExperienceLevel::EntryLevel, ExperienceLevel::Associate],
    };

    SearchQuery {
        role: role.title.trim().to_string(),
        location: role
            .location
            .clone()
            .unwrap_or_else(|| config.default_location.clone()),
        date_window,
        experience_levels,
        remote_mode: if role.remote {
            RemoteMode::Remote
        } else {
            RemoteMode::Any
        },
        requires_sponsorship: config.requires_sponsorship,
    }
}

/// Canonical results URL for a query page. `page` is zero-based; the source
/// paginates by a `start` offset of 25 postings per page.
pub fn search_url(query: &SearchQuery, page: u32) -> String {
    let mut url = url::Url::parse(SEARCH_BASE_URL).expect("static base URL parses");
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("keywords", &query.role);
        pairs.append_pair("location", &query.location);
        pairs.append_pair("f_TPR", &query.date_window.token());

        if !query.experience_levels.is_empty() {
            let codes: Vec<&str> = query
                .experience_levels
                .iter()
                .map(ExperienceLevel::wire_code)
                .collect();
            pairs.append_pair("f_E", &codes.join(","));
        }

        if let Some(code) = query.remote_mode.wire_code() {
            pairs.append_pair("f_WT", code);
        }

        // Newest first; the date window already bounds the tail.
        pairs.append_pair("sortBy", "DD");

        if page > 0 {
            pairs.append_pair("start", &(page * PAGE_SIZE).to_string());
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_config;

    fn role(title: &str) -> RoleConfig {
        RoleConfig {
            title: title.to_string(),
            location: None,
            experience_levels: None,
            remote: false,
            date_posted: None,
            enabled: true,
        }
    }

    #[test]
    fn query_uses_defaults_when_role_is_sparse() {
        let config = test_config();
        let query = build_query(&role("Data Scientist"), &SearchSettings::default(), &config);
        assert_eq!(query.role, "Data Scientist");
        assert_eq!(query.location, "United States");
        assert_eq!(query.date_window.seconds(), 86_400);
        assert_eq!(
            query.experience_levels,
            vec![ExperienceLevel::EntryLevel, ExperienceLevel::Associate]
        );
        assert_eq!(query.remote_mode, RemoteMode::Any);
    }

    #[test]
    fn role_date_window_overrides_settings() {
        let config = test_config();
        let mut r = role("ML Engineer");
        r.date_posted = Some("r7200".to_string());
        let settings = SearchSettings {
            date_posted: Some("r86400".to_string()),
        };
        let query = build_query(&r, &settings, &config);
        assert_eq!(query.date_window.seconds(), 7_200);
    }

    #[test]
    fn url_carries_filters_and_pagination() {
        let config = test_config();
        let mut r = role("Data Scientist");
        r.remote = true;
        r.experience_levels = Some(vec!["Entry level".to_string(), "Associate".to_string()]);
        let query = build_query(&r, &SearchSettings::default(), &config);

        let first = search_url(&query, 0);
        assert!(first.contains("keywords=Data+Scientist"));
        assert!(first.contains("f_TPR=r86400"));
        assert!(first.contains("f_WT=2"));
        assert!(first.contains("sortBy=DD"));
        assert!(!first.contains("start="));

        let third = search_url(&query, 2);
        assert!(third.contains("start=50"));
    }

    #[test]
    fn sub_hour_window_is_clamped() {
        let config = test_config();
        let mut r = role("Data Scientist");
        r.date_posted = Some("r60".to_string());
        let query = build_query(&r, &SearchSettings::default(), &config);
        assert!(search_url(&query, 0).contains("f_TPR=r3600"));
    }
}
