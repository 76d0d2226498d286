use tsql_query::table::TableDef;

pub struct Person;
pub struct Pet;

#[tsql_query::table("dbo.Person")]
impl Person {
    /// Primary key.
    #[column("Id")]
    fn id();
    #[column("Name")]
    fn name();

    #[foreign(Self(id) => Pet(owner_id))]
    fn pets();
}

#[tsql_query::table("Pet")]
impl Pet {
    #[column("OwnerId")]
    fn owner_id();
    fn nickname();

    #[foreign(Person(id) => Self(owner_id))]
    fn owner();
}

fn main() {
    assert_eq!(Person::table_schema(), Some("dbo"));
    assert_eq!(Pet::column_names(), &["OwnerId", "nickname"]);
    let _ = Person::pets().table().name();
    let _ = Pet::owner();
}
