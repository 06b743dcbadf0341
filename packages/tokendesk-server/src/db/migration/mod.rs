pub(crate) mod m00001_create_tables;
