pub mod datalink;
