mod helpers;
mod http_stub;
mod supabase_client_test;
