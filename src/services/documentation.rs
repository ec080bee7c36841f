use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Party Trivia Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::session_stream,
        crate::routes::game::create_game,
        crate::routes::game::join_game,
        crate::routes::game::run_action,
        crate::routes::game::get_game,
        crate::routes::game::delete_game,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::action::CreateGameRequest,
            crate::dto::action::CreateGameResponse,
            crate::dto::action::JoinGameRequest,
            crate::dto::action::JoinGameResponse,
            crate::dto::action::ActionKind,
            crate::dto::action::ActionRequest,
            crate::dto::action::ActionResponse,
            crate::dto::action::SwitchTeamData,
            crate::dto::action::UpdateConfigData,
            crate::dto::action::SubmitQuestionData,
            crate::dto::action::UpvoteQuestionData,
            crate::dto::action::SubmitAnswerData,
            crate::dto::action::UpvoteAnswerData,
            crate::dto::session::SessionSnapshot,
            crate::dto::sse::SessionEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "game", description = "Session lifecycle and player commands"),
    )
)]
pub struct ApiDoc;
