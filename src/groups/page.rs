use axum::{
    Form, debug_handler,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{Graphql, include_res, models::Group, res, session::CurrentUser};

#[derive(Debug, Deserialize)]
pub(crate) struct NewGroupForm {
    #[serde(default)]
    name: String,
}

fn page(user_name: &str, groups: &[Group], error: Option<&str>, new_group: &str) -> Html<String> {
    let mut group_items = String::new();
    for group in groups {
        group_items += &res::fill(
            include_res!(str, "/pages/group_item.html"),
            &[
                ("id", group.id.to_string().as_str()),
                ("name", res::escape(&group.name).as_str()),
                ("creator", res::escape(group.creator_label()).as_str()),
            ],
        );
    }

    Html(res::fill(
        include_res!(str, "/pages/groups.html"),
        &[
            ("user_name", res::escape(user_name).as_str()),
            ("alert", res::alert("error", error).as_str()),
            ("new_group", res::escape(new_group).as_str()),
            ("group_items", group_items.as_str()),
        ],
    ))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn groups_page(
    State(graphql): State<Graphql>,
    CurrentUser { user, .. }: CurrentUser,
) -> Html<String> {
    match super::list_groups(graphql.as_ref()).await {
        Ok(groups) => page(&user.name, &groups, None, ""),
        Err(e) => page(&user.name, &[], Some(&e.to_string()), ""),
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn new_group(
    State(graphql): State<Graphql>,
    CurrentUser { user, .. }: CurrentUser,
    Form(NewGroupForm { name }): Form<NewGroupForm>,
) -> Response {
    match super::create_group(graphql.as_ref(), &user, &name).await {
        Ok(_) => Redirect::to("/groups").into_response(),
        Err(e) => {
            let groups = super::list_groups(graphql.as_ref()).await.unwrap_or_default();
            page(&user.name, &groups, Some(&e.to_string()), &name).into_response()
        }
    }
}
