// Credential component
// Session and token handling live outside this service

pub mod password;
