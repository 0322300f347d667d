mod admin;
mod auth;
mod common;
mod public;

use rocket::Route;

/// All the API routes.
pub fn routes() -> Vec<Route> {
    [auth::routes(), public::routes(), admin::routes()].concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::http::Method;

    #[test]
    fn expected_endpoints_exist() {
        let mounted: Vec<(Method, String)> = routes()
            .iter()
            .map(|route| (route.method, route.uri.to_string()))
            .collect();

        let expected = [
            (Method::Post, "/login"),
            (Method::Get, "/surveys"),
            (Method::Post, "/surveys"),
            (Method::Get, "/surveys/<survey_id>"),
            (Method::Post, "/surveys/<survey_id>"),
            (Method::Put, "/surveys/<survey_id>"),
            (Method::Delete, "/surveys/<survey_id>"),
            (Method::Get, "/surveys/<survey_id>/questions"),
            (Method::Post, "/surveys/<survey_id>/questions"),
            (Method::Get, "/surveys/<survey_id>/questions/<question_id>"),
            (Method::Put, "/surveys/<survey_id>/questions/<question_id>"),
            (Method::Delete, "/surveys/<survey_id>/questions/<question_id>"),
            (
                Method::Get,
                "/surveys/<survey_id>/questions/<question_id>/questions-answers",
            ),
            (
                Method::Post,
                "/surveys/<survey_id>/questions/<question_id>/questions-answers",
            ),
            (
                Method::Get,
                "/surveys/<survey_id>/questions/<question_id>/questions-answers/<answer_id>",
            ),
            (
                Method::Put,
                "/surveys/<survey_id>/questions/<question_id>/questions-answers/<answer_id>",
            ),
            (
                Method::Delete,
                "/surveys/<survey_id>/questions/<question_id>/questions-answers/<answer_id>",
            ),
            // Submission history is part of the public surface.
            (Method::Get, "/completed-surveys/<user_id>"),
            (Method::Get, "/completed-surveys/<user_id>/<submission_id>"),
        ];
        for (method, path) in expected {
            assert!(
                mounted.contains(&(method, path.to_string())),
                "{method} {path} is not mounted"
            );
        }
        assert_eq!(mounted.len(), expected.len());
    }
}
