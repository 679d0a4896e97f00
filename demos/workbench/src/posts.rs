//! Posts feature: endpoints of the remote data client
//!
//! Arguments are request paths (`"/posts"`, `"/posts/1"`), the cache key
//! therefore distinguishes posts by path.

use serde::{Deserialize, Serialize};
use serde_json::json;
use sliceflow_query::{Api, MutationEndpoint, QueryEndpoint, RequestSpec, DEFAULT_REDUCER_PATH};

/// Number of posts shown on the list page
pub const PAGE_SIZE: usize = 10;

/// A remote post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Author id
    pub user_id: u64,
    /// Post id
    pub id: u64,
    /// Title
    pub title: String,
    /// Text
    pub body: String,
}

/// Body of a comment submission: the commented post plus the comment text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDraft {
    /// Title of the commented post
    pub title: String,
    /// Id of the commented post
    pub id: u64,
    /// The comment
    pub comment: String,
    /// Text of the commented post
    pub body: String,
    /// Author of the commented post
    pub user_id: u64,
}

impl CommentDraft {
    /// Draft commenting `comment` on `post`
    #[must_use]
    pub fn for_post(post: &Post, comment: impl Into<String>) -> Self {
        Self {
            title: post.title.clone(),
            id: post.id,
            comment: comment.into(),
            body: post.body.clone(),
            user_id: post.user_id,
        }
    }
}

/// Argument of [`POST_COMMENT`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRequest {
    /// Path to post to
    pub path: String,
    /// Comment body
    pub body: CommentDraft,
}

#[allow(clippy::ptr_arg)] // endpoint builders take `&Arg`
fn get_path(path: &String) -> RequestSpec {
    RequestSpec::get(path.as_str())
}

fn post_comment(arg: &CommentRequest) -> RequestSpec {
    let draft = &arg.body;
    RequestSpec::post(
        arg.path.as_str(),
        json!({
            "title": draft.title,
            "id": draft.id,
            "comment": draft.comment,
            "body": draft.body,
            "userId": draft.user_id,
        }),
    )
}

/// List posts at a path, usually `"/posts"`
pub static GET_POSTS: QueryEndpoint<String, Vec<Post>> = QueryEndpoint::new("getPosts", get_path);

/// One post at a path such as `"/posts/1"`
pub static GET_POST_BY_ID: QueryEndpoint<String, Post> = QueryEndpoint::new("getPostById", get_path);

/// Submit a comment
pub static POST_COMMENT: MutationEndpoint<CommentRequest, serde_json::Value> =
    MutationEndpoint::new("postComment", post_comment);

/// Path of the post with `id`
#[must_use]
pub fn post_path(id: u64) -> String {
    format!("/posts/{id}")
}

/// Registry of the three endpoints under the `baseApi` key
#[must_use]
pub fn api() -> Api {
    Api::builder(DEFAULT_REDUCER_PATH)
        .query(&GET_POSTS)
        .query(&GET_POST_BY_ID)
        .mutation(&POST_COMMENT)
        .build()
}

/// The posts shown on the list page
#[must_use]
pub fn first_page(posts: &[Post]) -> &[Post] {
    &posts[..posts.len().min(PAGE_SIZE)]
}
